//! Property diffing for table objects.
//!
//! Kept free of any storage access so the create/update/delete decision can be
//! tested on its own; the seeder applies the resulting plan.

use std::collections::HashMap;

/// A property row as currently stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredProperty {
    pub id: i64,
    pub name: String,
    pub value: String,
}

/// A property whose stored value must change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyUpdate {
    pub id: i64,
    pub name: String,
    pub value: String,
}

/// Changes needed to bring stored properties in line with the declared ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyPlan {
    /// `(name, value)` pairs to insert.
    pub create: Vec<(String, String)>,
    pub update: Vec<PropertyUpdate>,
    pub delete: Vec<StoredProperty>,
}

impl PropertyPlan {
    /// Returns `true` if nothing needs to change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.update.is_empty() && self.delete.is_empty()
    }
}

/// Diffs declared properties against stored ones.
///
/// For every declared `(name, value)`:
///
/// | stored | value     | action |
/// |--------|-----------|--------|
/// | no     | non-empty | create |
/// | yes    | non-empty | update (when the value differs) |
/// | yes    | empty     | delete |
/// | no     | empty     | none   |
///
/// Stored properties that are not declared are left alone. When storage holds
/// several rows with the same name, an empty value deletes all of them and a
/// non-empty value updates the first.
#[must_use]
pub fn reconcile_properties(
    desired: &[(String, String)],
    existing: &[StoredProperty],
) -> PropertyPlan {
    let mut stored: HashMap<&str, Vec<&StoredProperty>> = HashMap::with_capacity(existing.len());
    for property in existing {
        stored.entry(property.name.as_str()).or_default().push(property);
    }

    let mut plan = PropertyPlan::default();
    for (name, value) in desired {
        let rows = stored.get(name.as_str()).map(Vec::as_slice).unwrap_or_default();
        match (rows.first(), value.is_empty()) {
            (None, false) => plan.create.push((name.clone(), value.clone())),
            (None, true) => {}
            (Some(current), false) => {
                if current.value != *value {
                    plan.update.push(PropertyUpdate {
                        id: current.id,
                        name: name.clone(),
                        value: value.clone(),
                    });
                }
            }
            (Some(_), true) => plan.delete.extend(rows.iter().map(|row| (*row).clone())),
        }
    }
    plan
}
