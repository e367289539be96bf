//! Main-study vs sub-study classification.
//!
//! Some studies split their phenotype summaries across several file-name
//! prefixes. Only one prefix group is authoritative: the one that ships data
//! dictionaries. Groups that ship nothing but variable reports are
//! sub-studies.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::files::{FileGroups, FileType, RecordFiles};
use crate::{Error, Result};

/// Role of one (study id, sub-name) group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupRole {
    Main,
    SubStudy,
}

/// Classification result for one study id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyLayout {
    pub study_id: String,
    pub main: String,
    pub sub_studies: Vec<String>,
}

/// Role of a single group, or `None` for a group without XML metadata.
pub fn group_role(files: &RecordFiles) -> Option<GroupRole> {
    let types: BTreeSet<FileType> = files
        .values()
        .flat_map(|by_type| by_type.keys().copied())
        .filter(|ft| ft.is_xml())
        .collect();

    if types.is_empty() {
        None
    } else if types.len() == 1 && types.contains(&FileType::VarReport) {
        Some(GroupRole::SubStudy)
    } else {
        Some(GroupRole::Main)
    }
}

/// Classify one study's groups. Exactly one main candidate is required.
pub fn classify_study(groups: &FileGroups, study_id: &str) -> Result<StudyLayout> {
    let study = groups.study(study_id).ok_or_else(|| Error::StudyStructure {
        study_id: study_id.to_string(),
        message: "no metadata files".into(),
    })?;

    let mut mains = Vec::new();
    let mut sub_studies = Vec::new();
    for (sub_name, files) in study {
        match group_role(files) {
            Some(GroupRole::Main) => mains.push(sub_name.clone()),
            Some(GroupRole::SubStudy) => sub_studies.push(sub_name.clone()),
            None => tracing::debug!(study_id, sub_name = %sub_name, "group has no XML metadata; not classified"),
        }
    }

    match mains.len() {
        1 => {
            let main = mains.remove(0);
            tracing::debug!(study_id, main = %main, sub_studies = ?sub_studies, "classified study groups");
            Ok(StudyLayout { study_id: study_id.to_string(), main, sub_studies })
        }
        0 => Err(Error::StudyStructure {
            study_id: study_id.to_string(),
            message: "no group with a data dictionary".into(),
        }),
        _ => Err(Error::StudyStructure {
            study_id: study_id.to_string(),
            message: format!("multiple main study candidates: {}", mains.join(", ")),
        }),
    }
}

/// Classify every study in `groups`.
pub fn classify(groups: &FileGroups) -> Result<Vec<StudyLayout>> {
    groups.study_ids().map(|id| classify_study(groups, id)).collect()
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::study::files::MetadataFile;

    fn groups(names: &[&str]) -> FileGroups {
        let mut g = FileGroups::new();
        for name in names {
            g.insert(MetadataFile::parse(Path::new(name)).unwrap()).unwrap();
        }
        g
    }

    #[test]
    fn test_one_main_two_sub_studies() {
        let g = groups(&[
            "phs000001.v1.pht1.v1.Main_Subject.data_dict.xml",
            "phs000001.v1.pht1.v1.p1.Main_Subject.var_report.xml",
            "phs000001.v1.pht2.v1.p1.SubA_Subject_Phenotypes.var_report.xml",
            "phs000001.v1.pht3.v1.p1.SubB_Sample.var_report.xml",
        ]);
        let layout = classify_study(&g, "phs000001.v1").unwrap();
        assert_eq!(layout.main, "Main");
        assert_eq!(layout.sub_studies, vec!["SubA".to_string(), "SubB".to_string()]);
    }

    #[test]
    fn test_dictionary_only_group_is_main() {
        let g = groups(&["phs000001.v1.Main_Sample.data_dict.xml"]);
        assert_eq!(classify_study(&g, "phs000001.v1").unwrap().main, "Main");
    }

    #[test]
    fn test_zero_main_is_error() {
        let g = groups(&[
            "phs000001.v1.SubA_Subject.var_report.xml",
            "phs000001.v1.SubB_Subject.var_report.xml",
        ]);
        assert!(matches!(
            classify_study(&g, "phs000001.v1"),
            Err(Error::StudyStructure { .. })
        ));
    }

    #[test]
    fn test_two_mains_is_error() {
        let g = groups(&[
            "phs000001.v1.A_Subject.data_dict.xml",
            "phs000001.v1.B_Subject.data_dict.xml",
            "phs000001.v1.B_Subject.var_report.xml",
        ]);
        let err = classify_study(&g, "phs000001.v1").unwrap_err();
        assert!(err.to_string().contains("A, B"), "{err}");
    }

    #[test]
    fn test_studies_classified_independently() {
        let g = groups(&[
            "phs000001.v1.A_Subject.data_dict.xml",
            "phs000002.v1.B_Subject.data_dict.xml",
            "phs000002.v1.C_Subject.var_report.xml",
        ]);
        let layouts = classify(&g).unwrap();
        assert_eq!(layouts.len(), 2);
        assert_eq!(layouts[1].sub_studies, vec!["C".to_string()]);
    }
}
