//! # Feature Groups
//!
//! A feature group is a named, fixed set of imaging-derived columns that is withheld as
//! one unit during ablation. The registry is an immutable, ordered list: its order is the
//! order of every result list produced downstream, so it must never be re-sorted.
//!
//! - Groups never overlap: a column belongs to at most one group.
//! - Membership is validated once against each cohort table before any model is fitted.

use crate::error::AblationError;
use crate::table::CohortTable;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One ablation unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureGroup {
    /// Machine name used in file names, e.g. `cortical_thickness`.
    pub name: String,
    /// Human-readable name used in console output and plot captions.
    #[serde(default)]
    pub label: Option<String>,
    pub columns: Vec<String>,
}

impl FeatureGroup {
    pub fn new(name: &str, label: &str, columns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            label: Some(label.to_string()),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

/// The validated, ordered registry of feature groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureGroups {
    groups: Vec<FeatureGroup>,
}

impl FeatureGroups {
    /// Validates and freezes a list of groups. The list itself must not be empty, and every
    /// group needs a unique name and at least one column. A column may appear only once,
    /// both within a group and across groups.
    pub fn new(groups: Vec<FeatureGroup>) -> Result<Self, AblationError> {
        if groups.is_empty() {
            return Err(AblationError::EmptyRegistry);
        }
        let mut names = HashSet::with_capacity(groups.len());
        let mut owner: HashMap<&str, &str> = HashMap::new();

        for group in &groups {
            if !names.insert(group.name.as_str()) {
                return Err(AblationError::DuplicateGroup(group.name.clone()));
            }
            if group.columns.is_empty() {
                return Err(AblationError::EmptyGroup(group.name.clone()));
            }
            for column in &group.columns {
                if let Some(first) = owner.insert(column.as_str(), group.name.as_str()) {
                    if first == group.name {
                        return Err(AblationError::RepeatedGroupColumn {
                            column: column.clone(),
                            group: group.name.clone(),
                        });
                    }
                    return Err(AblationError::OverlappingGroups {
                        column: column.clone(),
                        first: first.to_string(),
                        second: group.name.clone(),
                    });
                }
            }
        }

        Ok(Self { groups })
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FeatureGroup> {
        self.groups.iter()
    }

    pub fn as_slice(&self) -> &[FeatureGroup] {
        &self.groups
    }

    pub fn names(&self) -> Vec<String> {
        self.groups.iter().map(|g| g.name.clone()).collect()
    }

    /// Checks that every group column is a feature column of `table`.
    pub fn validate_against(&self, table: &CohortTable) -> Result<(), AblationError> {
        for group in &self.groups {
            for column in &group.columns {
                if !table.has_column(column) {
                    return Err(AblationError::MissingColumn {
                        column: column.clone(),
                        table: table.label().to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a FeatureGroups {
    type Item = &'a FeatureGroup;
    type IntoIter = std::slice::Iter<'a, FeatureGroup>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.iter()
    }
}

impl Default for FeatureGroups {
    /// The seven imaging modalities of the study, in reporting order.
    fn default() -> Self {
        Self {
            groups: vec![
                FeatureGroup::new(
                    "hyperintensities_flair",
                    "FLAIR hyperintensities",
                    HYPERINTENSITIES_FLAIR,
                ),
                FeatureGroup::new("dti", "DTI", DTI),
                FeatureGroup::new("cbf", "CBF", CBF),
                FeatureGroup::new(
                    "resting_state_activation",
                    "Resting-state activation",
                    RESTING_STATE_ACTIVATION,
                ),
                FeatureGroup::new(
                    "ventricular_volume",
                    "Ventricular volume",
                    VENTRICULAR_VOLUME,
                ),
                FeatureGroup::new("surface_area", "Surface area", SURFACE_AREA),
                FeatureGroup::new(
                    "cortical_thickness",
                    "Cortical thickness",
                    CORTICAL_THICKNESS,
                ),
            ],
        }
    }
}

const HYPERINTENSITIES_FLAIR: &[&str] = &[
    "Left Deep White Matter Hyperintensity volume (mm3) FLAIR",
    "Right Deep White Matter Hyperintensity volume (mm3) FLAIR",
    "Left Periventricular Hyperintensity volume (mm3) FLAIR",
    "Right periventricular Hyperintensity volume (mm3) FLAIR",
];

const DTI: &[&str] = &[
    "Right cingulum hippocampus FA non zero mean -JHU",
    "Left cingulum hippocampus FA non zero mean -JHU",
    "Corpus Callosum body FA mean TBSS",
    "Corpus Callosum Genu FA mean TBSS",
    "Corpus Callosum Splenium FA mean TBSS",
    "Left superior longitudinal fasciculus FA mean TBSS",
    "Right superior longitudinal fasciculus FA mean TBSS",
    "Left Uncinate Fasciculus FA mean TBSS",
    "Right Uncinate Fasciculus FA mean TBSS",
];

const CBF: &[&str] = &[
    "NZ mean L hippocampus CBF",
    "NZ mean R hippocampus CBF",
    "NZ mean L parahippocampal CBF",
    "NZ mean R parahippocampal CBF",
    "Left medial inferior frontal lobe CBF",
    "Right medial inferior frontal lobe CBF",
    "Left superiolateral frontal lobe CBF",
    "Right superiolateral frontal lobe CBF",
    "Left lateral parietal lobe CBF",
    "Right lateral parietal lobe CBF",
    "left medial parietal lobe CBF",
    "Right medial parietal lobe CBF",
    "Left frontal Lobe CBF",
    "Right frontal Lobe CBF",
    "Left parietal Lobe CBF",
    "Right parietal Lobe CBF",
    "Left hemisphere CBF",
    "Right hemisphere CBF",
    "Whole Brain Gray Matter CBF nz mean",
];

// rs = resting state, n-back = 2v1 contrasts, DMS = delayed match to sample.
const RESTING_STATE_ACTIVATION: &[&str] = &[
    "DMN resting state Z correlation",
    "Task positive network Z correlation",
    "2v1 right anterior cingulate deactivation",
    "2v1 right parietal lobule activation",
    "2v1 left middle frontal gyrus activation",
    "2v1 right middle frontal gyrus activation",
    "Left middle frontal gyrus DMS activation",
    "Right middle frontal gyrus DMS activation",
    "Left supramarginal (parietal) gyrus DMS activation",
    "Right supramarginal (parietal) gyrus DMS activation",
];

const VENTRICULAR_VOLUME: &[&str] = &[
    "Left_Lateral_Ventricle V",
    "Right_Lateral_Ventricle V",
    "Left_Inf_Lat_Vent V",
    "Right_Inf_Lat_Vent V",
    "parahippocampal_Left_V",
    "parahippocampal_Right_V",
    "Left_Hippocampus V",
    "Right_Hippocampus V",
    "Left hippocampal and parahippocampal volume",
    "Right hippocampal and parahippocampal volume",
    "total left hemisphere gray matter volume",
    "total right hemisphere gray matter volume",
    "total whole brain gray matter volume",
];

const SURFACE_AREA: &[&str] = &[
    "Left medial inferior frontal lobe surface area",
    "Right medial inferior frontal lobe surface area",
    "Left superiolateral frontal lobe surface area",
    "Right superiolateral frontal lobe surface area",
    "Left medial parietal lobe surface area",
    "Right medial parietal lobe surface area",
    "Left lateral parietal lobe surface area",
    "Right lateral parietal lobe surface area",
    "Left frontal lobe surface area",
    "Right frontal lobe surface area",
    "Left parietal lobe surface area",
    "Right parietal lobe surface area",
    "Total Left hemisphere surface area",
    "Total right hemisphere surface area",
    "total whole brain surface area",
];

const CORTICAL_THICKNESS: &[&str] = &[
    "Left medial inferior frontal lobe cortical thickness",
    "Right medial inferior frontal lobe cortical thickness",
    "Left superiolateral frontal lobe cortical thickness",
    "Right superiolateral frontal lobe cortical thickness",
    "Left medial parietal lobe cortical thickness",
    "Right medial parietal lobe cortical thickness",
    "Left lateral parietal lobe cortical thickness",
    "Right lateral parietal lobe cortical thickness",
    "Left frontal lobe average cortical thickness",
    "Right frontal lobe average cortical thickness",
    "Left parietal lobe average cortical thickness",
    "Right parietal lobe average cortical thickness",
    "total left hemisphere average cortical thickness",
    "total right hemisphere average cortical thickness",
    "total whole brain average cortical thickness",
];
