//! Record reconciler
//!
//! Converges one record of a zone to a desired value with at most one
//! write to the backend:
//!
//! ```text
//! get_records ──► plan_update ──┬── UpToDate ──────────────► (no write)
//!                               ├── Create  {desired} ─┐
//!                               └── Replace {desired} ─┴──► set_records (once)
//! ```
//!
//! A replace relies on the backend's set semantics to supersede the old
//! record; nothing is deleted separately. Concurrent updates of the same
//! record are not serialized here.

use crate::error::{Error, Result};
use crate::traits::{ZoneBackend, ZoneRecord};
use tracing::{debug, info};

/// What a reconciliation pass has to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdatePlan {
    /// A record with the desired name, type and value exists
    UpToDate {
        /// The matching record as reported by the backend
        existing: ZoneRecord,
    },
    /// No record with the desired name and type exists
    Create {
        /// Record to write
        record: ZoneRecord,
    },
    /// A record with the desired name and type carries another value
    Replace {
        /// Record being superseded
        previous: ZoneRecord,
        /// Record to write
        record: ZoneRecord,
    },
}

impl UpdatePlan {
    /// The update set to hand to `set_records`; empty when up to date
    pub fn update_set(&self) -> Vec<ZoneRecord> {
        match self {
            UpdatePlan::UpToDate { .. } => Vec::new(),
            UpdatePlan::Create { record } | UpdatePlan::Replace { record, .. } => {
                vec![record.clone()]
            }
        }
    }
}

/// Result of a reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Nothing was written
    UpToDate,
    /// The record did not exist and was created
    Created,
    /// The record existed with another value and was replaced
    Replaced {
        /// Value before the update
        previous: String,
    },
}

impl UpdateOutcome {
    /// `true` if the backend was written to
    pub fn changed(&self) -> bool {
        !matches!(self, UpdateOutcome::UpToDate)
    }
}

/// Decide how to converge `current` to `desired` inside `zone`
///
/// The first current record whose fully-qualified name and type match the
/// desired record decides the plan.
pub fn plan_update(current: &[ZoneRecord], zone: &str, desired: &ZoneRecord) -> UpdatePlan {
    let fqdn = desired.fqdn(zone);

    let existing = current
        .iter()
        .find(|r| r.record_type == desired.record_type && r.fqdn(zone).eq_ignore_ascii_case(&fqdn));

    match existing {
        None => UpdatePlan::Create {
            record: desired.clone(),
        },
        Some(existing) if existing.same_value(desired) => UpdatePlan::UpToDate {
            existing: existing.clone(),
        },
        Some(existing) => UpdatePlan::Replace {
            previous: existing.clone(),
            record: desired.clone(),
        },
    }
}

/// Converge `desired` into `zone` through `backend`
///
/// Reads the zone once and writes at most once. Backend failures are
/// returned as [`Error::Backend`] carrying the cause; nothing is retried.
pub async fn update(
    zone: &str,
    desired: &ZoneRecord,
    backend: &dyn ZoneBackend,
) -> Result<UpdateOutcome> {
    let fqdn = desired.fqdn(zone);
    debug!(
        "Reconciling {} {} -> {} via {}",
        fqdn,
        desired.record_type,
        desired.value,
        backend.backend_name()
    );

    let current = backend
        .get_records(zone)
        .await
        .map_err(|e| Error::backend("get records", zone, e))?;
    debug!("Zone {} has {} records", zone, current.len());

    let plan = plan_update(&current, zone, desired);
    let outcome = match &plan {
        UpdatePlan::UpToDate { .. } => {
            info!("{} {} is already up to date ({})", fqdn, desired.record_type, desired.value);
            return Ok(UpdateOutcome::UpToDate);
        }
        UpdatePlan::Create { .. } => UpdateOutcome::Created,
        UpdatePlan::Replace { previous, .. } => UpdateOutcome::Replaced {
            previous: previous.value.clone(),
        },
    };

    backend
        .set_records(zone, &plan.update_set())
        .await
        .map_err(|e| Error::backend("set records", zone, e))?;

    match &outcome {
        UpdateOutcome::Replaced { previous } => info!(
            "Updated {} {}: {} -> {}",
            fqdn, desired.record_type, previous, desired.value
        ),
        _ => info!("Created {} {} {}", fqdn, desired.record_type, desired.value),
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::relative_name;
    use crate::wire::RecordType;

    fn a(name: &str, value: &str) -> ZoneRecord {
        ZoneRecord::new(name, RecordType::A, value)
    }

    #[test]
    fn test_plan_create_when_missing() {
        let current = vec![a("mail", "1.2.3.4")];
        let desired = a("www", "1.2.3.4");

        let plan = plan_update(&current, "example.com", &desired);
        assert_eq!(plan, UpdatePlan::Create { record: desired.clone() });
        assert_eq!(plan.update_set(), vec![desired]);
    }

    #[test]
    fn test_plan_up_to_date() {
        let current = vec![a("www.example.com", "1.2.3.4")];
        let desired = a("www", "1.2.3.4");

        let plan = plan_update(&current, "example.com", &desired);
        assert!(matches!(plan, UpdatePlan::UpToDate { .. }));
        assert!(plan.update_set().is_empty());
    }

    #[test]
    fn test_plan_replace_on_different_value() {
        let current = vec![a("www.example.com", "1.2.3.4")];
        let desired = a("www", "5.6.7.8");

        let plan = plan_update(&current, "example.com", &desired);
        assert_eq!(
            plan,
            UpdatePlan::Replace {
                previous: current[0].clone(),
                record: desired.clone(),
            }
        );
        assert_eq!(plan.update_set(), vec![desired]);
    }

    #[test]
    fn test_plan_type_must_match() {
        let current = vec![ZoneRecord::new("www", RecordType::Aaaa, "2001:db8::1")];
        let desired = a("www", "1.2.3.4");

        assert!(matches!(
            plan_update(&current, "example.com", &desired),
            UpdatePlan::Create { .. }
        ));
    }

    #[test]
    fn test_plan_apex_matches_zone() {
        let current = vec![a("", "1.2.3.4"), a("www", "9.9.9.9")];

        let plan = plan_update(&current, "example.com", &a("@", "1.2.3.4"));
        assert!(matches!(plan, UpdatePlan::UpToDate { .. }));

        let plan = plan_update(&current, "example.com", &a("", "9.9.9.9"));
        assert!(matches!(plan, UpdatePlan::Replace { .. }));
    }

    #[test]
    fn test_plan_name_comparison_ignores_case_and_trailing_dot() {
        let current = vec![a("WWW.Example.COM.", "1.2.3.4")];
        let plan = plan_update(&current, "example.com.", &a("www", "1.2.3.4"));
        assert!(matches!(plan, UpdatePlan::UpToDate { .. }));
    }

    #[test]
    fn test_plan_doubly_qualified_backend_record_is_not_the_desired_one() {
        let zone = "example.com";
        let stray = a(&relative_name("www.example.com.example.com", zone), "1.2.3.4");

        let plan = plan_update(&[stray.clone()], zone, &a("www", "1.2.3.4"));
        assert_eq!(plan, UpdatePlan::Create { record: a("www", "1.2.3.4") });

        let plan = plan_update(&[stray], zone, &a("www", "5.6.7.8"));
        assert!(matches!(plan, UpdatePlan::Create { .. }));
    }

    #[test]
    fn test_outcome_changed() {
        assert!(!UpdateOutcome::UpToDate.changed());
        assert!(UpdateOutcome::Created.changed());
        assert!(UpdateOutcome::Replaced {
            previous: "1.2.3.4".to_string()
        }
        .changed());
    }
}
