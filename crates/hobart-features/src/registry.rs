//! Deriver registry.
//!
//! Static metadata for all derivers: name, source table, required columns.
//! Lets callers discover what sources the pipeline can consume and validate
//! inputs before instantiating anything.

use std::collections::HashMap;

/// Deriver metadata
#[derive(Debug, Clone)]
pub struct DeriverInfo {
    /// Deriver name (unique identifier)
    pub name: &'static str,
    /// Raw source table the deriver consumes
    pub source_table: &'static str,
    /// Brief description of the features it produces
    pub description: &'static str,
    /// Required column names in the source table
    pub required_columns: &'static [&'static str],
}

/// Get all available deriver info
pub fn available_derivers() -> Vec<DeriverInfo> {
    vec![
        DeriverInfo {
            name: "application",
            source_table: "application",
            description: "Age, employment, amount-log, external-score, and document features",
            required_columns: &[
                "sk_id_curr",
                "days_birth",
                "days_employed",
                "amt_credit",
                "amt_annuity",
                "amt_goods_price",
                "amt_income_total",
                "ext_source_1",
                "ext_source_2",
                "ext_source_3",
                "def_30_cnt_social_circle",
            ],
        },
        DeriverInfo {
            name: "bureau",
            source_table: "bureau",
            description: "External-loan counts, corrected total debt, and history length",
            required_columns: &[
                "sk_id_curr",
                "sk_id_bureau",
                "credit_active",
                "amt_credit_sum",
                "amt_credit_sum_debt",
                "days_credit_enddate",
                "days_enddate_fact",
                "days_credit_update",
            ],
        },
        DeriverInfo {
            name: "previous",
            source_table: "previous_application",
            description: "Approval and client-type rates, amount and duration aggregates",
            required_columns: &[
                "sk_id_curr",
                "sk_id_prev",
                "amt_annuity",
                "amt_credit",
                "amt_application",
                "amt_goods_price",
                "days_decision",
                "days_first_due",
                "days_last_due",
                "name_contract_status",
                "name_client_type",
                "weekday_appr_process_start",
            ],
        },
        DeriverInfo {
            name: "card",
            source_table: "credit_card_balance",
            description: "Monthly utilization and over-limit counts",
            required_columns: &[
                "sk_id_curr",
                "sk_id_prev",
                "months_balance",
                "amt_balance",
                "amt_credit_limit_actual",
            ],
        },
        DeriverInfo {
            name: "installment",
            source_table: "installments_payments",
            description: "Payment delay rate and mean delay magnitude",
            required_columns: &[
                "sk_id_curr",
                "sk_id_prev",
                "num_instalment_number",
                "days_instalment",
                "days_entry_payment",
            ],
        },
        DeriverInfo {
            name: "pos",
            source_table: "pos_cash_balance",
            description: "Any-severe-delinquency flag",
            required_columns: &["sk_id_curr", "sk_id_prev", "sk_dpd_def"],
        },
    ]
}

/// Get deriver info by name
pub fn deriver_info(name: &str) -> Option<DeriverInfo> {
    available_derivers().into_iter().find(|d| d.name == name)
}

/// Get a map of all derivers indexed by name
pub fn deriver_map() -> HashMap<&'static str, DeriverInfo> {
    available_derivers().into_iter().map(|d| (d.name, d)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SourceDeriver;

    #[test]
    fn registry_covers_six_sources() {
        assert_eq!(available_derivers().len(), 6);
        let map = deriver_map();
        assert!(map.contains_key("bureau"));
        assert!(map.contains_key("pos"));
    }

    #[test]
    fn lookup_by_name() {
        let info = deriver_info("card").unwrap();
        assert_eq!(info.source_table, "credit_card_balance");
        assert!(info.required_columns.contains(&"amt_credit_limit_actual"));
        assert!(deriver_info("nonexistent").is_none());
    }

    #[test]
    fn registry_matches_deriver_impls() {
        let map = deriver_map();
        assert_eq!(
            map["card"].required_columns,
            crate::CardDeriver::default().required_columns()
        );
        assert_eq!(
            map["installment"].required_columns,
            crate::InstallmentDeriver.required_columns()
        );
        assert_eq!(
            map["pos"].required_columns,
            crate::PosDeriver.required_columns()
        );
        assert_eq!(
            map["previous"].required_columns,
            crate::PreviousDeriver.required_columns()
        );
        assert_eq!(
            map["application"].required_columns,
            crate::ApplicationDeriver::default().required_columns()
        );
    }

    #[test]
    fn every_deriver_requires_the_applicant_id() {
        for info in available_derivers() {
            assert!(
                info.required_columns.contains(&"sk_id_curr"),
                "Deriver {} missing 'sk_id_curr' in required columns",
                info.name
            );
        }
    }
}
