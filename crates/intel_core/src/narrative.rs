//! Operation phase by elapsed day.

use crate::{Catalog, OperationPhase};

/// Latest phase whose start day has been reached. Falls back to a neutral
/// collection phase when the catalog lists none.
pub fn operation_phase(catalog: &Catalog, elapsed_days: u64) -> OperationPhase {
    catalog
        .phases
        .iter()
        .filter(|phase| elapsed_days >= phase.day)
        .max_by_key(|phase| phase.day)
        .or_else(|| catalog.phases.first())
        .cloned()
        .unwrap_or_else(|| OperationPhase {
            name: "COLLECTION".to_string(),
            description: String::new(),
            day: 0,
            alert_level: "ELEVATED".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::base_catalog;

    #[test]
    fn phases_advance_with_days() {
        let catalog = base_catalog();
        let names: Vec<String> = [0, 1, 2, 5, 7, 8, 12, 16, 400]
            .into_iter()
            .map(|day| operation_phase(&catalog, day).name)
            .collect();
        assert_eq!(
            names,
            [
                "COLLECTION",
                "COLLECTION",
                "CORRELATION",
                "IDENTIFICATION",
                "IDENTIFICATION",
                "TRACKING",
                "CONVERGENCE",
                "INTERCEPTION",
                "INTERCEPTION"
            ]
        );
    }

    #[test]
    fn final_phase_is_maximum_alert() {
        let catalog = base_catalog();
        assert_eq!(operation_phase(&catalog, 16).alert_level, "MAXIMUM");
    }
}
