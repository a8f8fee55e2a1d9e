//! Field-level comparison of PEI payloads.
//!
//! Pure functions over immutable payloads; no side effects. Fields are
//! addressed as `section.key` over the top-level keys of each section
//! document; a section that is not a JSON object is compared wholesale
//! under the section name.

use crate::models::PeiPayload;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// One changed field. `before`/`after` are `None` when the field is
/// absent on that side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDiff {
    pub field: String,
    pub before: Option<Value>,
    pub after: Option<Value>,
}

/// The comparison of two versions of a student's PEI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionDiff {
    pub from_version: u32,
    pub to_version: u32,
    pub changes: Vec<FieldDiff>,
}

impl VersionDiff {
    /// Changed field names only, bounded in size; what the audit trail
    /// stores as the changed-fields summary.
    pub fn changed_field_names(&self) -> Vec<String> {
        self.changes.iter().map(|c| c.field.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Compare two payloads field by field. Deterministic: changes come out
/// ordered by field name.
pub fn diff_payloads(before: &PeiPayload, after: &PeiPayload) -> Vec<FieldDiff> {
    let mut changes = Vec::new();
    for ((section, old), (_, new)) in before.sections().into_iter().zip(after.sections()) {
        diff_section(section, old, new, &mut changes);
    }
    changes.sort_by(|a, b| a.field.cmp(&b.field));
    changes
}

fn diff_section(section: &str, old: &Value, new: &Value, out: &mut Vec<FieldDiff>) {
    match (old.as_object(), new.as_object()) {
        (Some(old_map), Some(new_map)) => {
            let keys: BTreeSet<&String> = old_map.keys().chain(new_map.keys()).collect();
            for key in keys {
                let before = old_map.get(key);
                let after = new_map.get(key);
                if before != after {
                    out.push(FieldDiff {
                        field: format!("{section}.{key}"),
                        before: before.cloned(),
                        after: after.cloned(),
                    });
                }
            }
        }
        _ => {
            if old != new {
                out.push(FieldDiff {
                    field: section.to_string(),
                    before: Some(old.clone()),
                    after: Some(new.clone()),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identical_payloads_have_no_changes() {
        let payload = PeiPayload::new(
            json!({"cid": "F84.0"}),
            json!({"goals": ["reading"]}),
            json!({}),
        );
        assert!(diff_payloads(&payload, &payload).is_empty());
    }

    #[test]
    fn changed_added_and_removed_keys_are_reported() {
        let before = PeiPayload::new(
            json!({"cid": "F84.0", "notes": "initial"}),
            json!({"goals": ["reading"]}),
            json!({}),
        );
        let after = PeiPayload::new(
            json!({"cid": "F84.1"}),
            json!({"goals": ["reading"], "supports": ["aee"]}),
            json!({}),
        );

        let changes = diff_payloads(&before, &after);
        let fields: Vec<&str> = changes.iter().map(|c| c.field.as_str()).collect();
        assert_eq!(fields, vec!["diagnosis.cid", "diagnosis.notes", "planning.supports"]);

        let cid = &changes[0];
        assert_eq!(cid.before, Some(json!("F84.0")));
        assert_eq!(cid.after, Some(json!("F84.1")));

        let removed = &changes[1];
        assert_eq!(removed.before, Some(json!("initial")));
        assert_eq!(removed.after, None);

        let added = &changes[2];
        assert_eq!(added.before, None);
        assert_eq!(added.after, Some(json!(["aee"])));
    }

    #[test]
    fn non_object_sections_compare_wholesale() {
        let before = PeiPayload::new(json!("free text"), json!({}), json!({}));
        let after = PeiPayload::new(json!("revised text"), json!({}), json!({}));

        let changes = diff_payloads(&before, &after);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "diagnosis");
    }
}
