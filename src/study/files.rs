//! Release-directory file names and their fixed-depth grouping.
//!
//! dbGaP names every metadata file after the study, table, consent group,
//! sub-study and record type it describes:
//!
//! ```text
//! phs000424.v7.pht002742.v7.GTEx_Subject_Phenotypes.data_dict.xml
//! phs000424.v7.pht002742.v7.p2.GTEx_Subject_Phenotypes.var_report.xml
//! phs000424.v7.pht002742.v7.p2.c1.GTEx_Subject_Phenotypes.GRU.txt
//! └─study─────┘└─table──────┘└p┘└c┘└sub┘ └─record type────┘ └file type┘
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// The subject matter of one attribute table.
///
/// Variant order is the fixed search order used wherever record types are
/// scanned in turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecordType {
    Subject,
    SubjectPhenotypes,
    Sample,
    SampleAttributes,
    Pedigree,
}

impl RecordType {
    pub const ALL: [RecordType; 5] = [
        RecordType::Subject,
        RecordType::SubjectPhenotypes,
        RecordType::Sample,
        RecordType::SampleAttributes,
        RecordType::Pedigree,
    ];

    /// The token used in file names.
    pub fn token(self) -> &'static str {
        match self {
            RecordType::Subject => "Subject",
            RecordType::SubjectPhenotypes => "Subject_Phenotypes",
            RecordType::Sample => "Sample",
            RecordType::SampleAttributes => "Sample_Attributes",
            RecordType::Pedigree => "Pedigree",
        }
    }

    pub fn from_token(token: &str) -> Option<RecordType> {
        RecordType::ALL.into_iter().find(|rt| rt.token() == token)
    }

    /// Whether rows of this type describe subjects (as opposed to samples).
    pub fn is_subject_level(self) -> bool {
        matches!(self, RecordType::Subject | RecordType::SubjectPhenotypes | RecordType::Pedigree)
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Kind of metadata file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FileType {
    /// XML data dictionary: variable declarations, no values.
    DataDict,
    /// XML variable report: per-variable summary statistics.
    VarReport,
    /// Tab-delimited access-restricted attribute table.
    Table,
}

impl FileType {
    pub fn is_xml(self) -> bool {
        !matches!(self, FileType::Table)
    }
}

/// Consent group encoded in a file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Consent {
    /// `.c<N>`
    pub suffix: String,
    /// Data-use abbreviation such as `GRU` or `HMB-IRB`, when present.
    pub abbreviation: Option<String>,
}

/// One metadata file and everything its name tells us.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataFile {
    pub name: String,
    pub path: PathBuf,
    /// `phs<N>.v<N>`
    pub study_id: String,
    /// `pht<N>.v<N>`
    pub table_id: Option<String>,
    pub sub_name: String,
    pub record_type: RecordType,
    pub file_type: FileType,
    pub consent: Option<Consent>,
}

fn is_prefixed_number(seg: &str, prefix: &str) -> bool {
    seg.strip_prefix(prefix)
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
}

fn bad_name(path: &Path, message: impl Into<String>) -> Error {
    Error::StructuralParse { path: path.to_path_buf(), message: message.into() }
}

/// Split `<SubName>_<RecordType>`, longest record-type token first.
fn split_stem(stem: &str) -> Option<(&str, RecordType)> {
    let mut types = RecordType::ALL;
    types.sort_by_key(|rt| std::cmp::Reverse(rt.token().len()));
    types.into_iter().find_map(|rt| {
        let sub = stem.strip_suffix(rt.token())?.strip_suffix('_')?;
        (!sub.is_empty()).then_some((sub, rt))
    })
}

impl MetadataFile {
    /// Parse a dbGaP metadata file name. `path` is only carried along.
    pub fn parse(path: &Path) -> Result<MetadataFile> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| bad_name(path, "file name is not valid UTF-8"))?;
        let segs: Vec<&str> = name.split('.').collect();

        if segs.len() < 4 || !is_prefixed_number(segs[0], "phs") || !is_prefixed_number(segs[1], "v") {
            return Err(bad_name(path, format!("unable to parse study id from '{name}'")));
        }
        let study_id = format!("{}.{}", segs[0], segs[1]);
        let mut i = 2;

        let mut table_id = None;
        if is_prefixed_number(segs[i], "pht") && segs.get(i + 1).is_some_and(|s| is_prefixed_number(s, "v")) {
            table_id = Some(format!("{}.{}", segs[i], segs[i + 1]));
            i += 2;
        }
        if segs.get(i).is_some_and(|s| is_prefixed_number(s, "p")) {
            i += 1;
        }
        let mut consent_suffix = None;
        if segs.get(i).is_some_and(|s| is_prefixed_number(s, "c")) {
            consent_suffix = Some(format!(".{}", segs[i]));
            i += 1;
        }

        let rest = &segs[i..];
        let (stem, file_type, abbreviation) = match rest {
            [stem, "data_dict", "xml"] => (*stem, FileType::DataDict, None),
            [stem, "var_report", "xml"] => (*stem, FileType::VarReport, None),
            [stem, abbr, "txt"] => (*stem, FileType::Table, Some(abbr.to_string())),
            [stem, "txt"] => (*stem, FileType::Table, None),
            _ => {
                return Err(bad_name(path, format!("unable to parse file type from '{name}'")));
            }
        };
        let (sub_name, record_type) = split_stem(stem)
            .ok_or_else(|| bad_name(path, format!("unable to parse record type and sub-study from '{stem}'")))?;

        let consent = match (consent_suffix, abbreviation) {
            (Some(suffix), abbreviation) => Some(Consent { suffix, abbreviation }),
            (None, Some(abbreviation)) => Some(Consent { suffix: String::new(), abbreviation: Some(abbreviation) }),
            (None, None) => None,
        };

        Ok(MetadataFile {
            name: name.to_string(),
            path: path.to_path_buf(),
            study_id,
            table_id,
            sub_name: sub_name.to_string(),
            record_type,
            file_type,
            consent,
        })
    }

    /// Consent suffix (`.c1`) if the name carried one.
    pub fn consent_suffix(&self) -> Option<&str> {
        self.consent.as_ref().map(|c| c.suffix.as_str()).filter(|s| !s.is_empty())
    }
}

/// Files of one release directory, grouped at fixed depth:
///
/// `study id → sub-name → record type → file type → files`
///
/// XML file types hold at most one file per slot. Restricted tables may hold
/// one file per consent group.
#[derive(Debug, Clone, Default)]
pub struct FileGroups {
    studies: BTreeMap<String, BTreeMap<String, BTreeMap<RecordType, BTreeMap<FileType, Vec<MetadataFile>>>>>,
}

/// The record-type level of one (study, sub-name) group.
pub type RecordFiles = BTreeMap<RecordType, BTreeMap<FileType, Vec<MetadataFile>>>;

impl FileGroups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, file: MetadataFile) -> Result<()> {
        let slot = self
            .studies
            .entry(file.study_id.clone())
            .or_default()
            .entry(file.sub_name.clone())
            .or_default()
            .entry(file.record_type)
            .or_default()
            .entry(file.file_type)
            .or_default();

        let clash = slot.iter().any(|f| file.file_type.is_xml() || f.consent == file.consent);
        if clash {
            return Err(Error::DuplicateKey {
                kind: "metadata file".into(),
                key: format!(
                    "{}/{}/{}/{:?} ({})",
                    file.study_id, file.sub_name, file.record_type, file.file_type, file.name
                ),
            });
        }
        slot.push(file);
        Ok(())
    }

    pub fn study_ids(&self) -> impl Iterator<Item = &str> {
        self.studies.keys().map(String::as_str)
    }

    /// Sub-name → record files for one study.
    pub fn study(&self, study_id: &str) -> Option<&BTreeMap<String, RecordFiles>> {
        self.studies.get(study_id)
    }

    pub fn group(&self, study_id: &str, sub_name: &str) -> Option<&RecordFiles> {
        self.studies.get(study_id)?.get(sub_name)
    }

    /// The single XML file of a given type in one group.
    pub fn xml_file(&self, study_id: &str, sub_name: &str, rt: RecordType, ft: FileType) -> Option<&MetadataFile> {
        self.group(study_id, sub_name)?.get(&rt)?.get(&ft)?.first()
    }

    pub fn files(&self) -> impl Iterator<Item = &MetadataFile> {
        self.studies
            .values()
            .flat_map(BTreeMap::values)
            .flat_map(BTreeMap::values)
            .flat_map(BTreeMap::values)
            .flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.studies.is_empty()
    }
}

/// Collect and group the dbGaP metadata files in `dir`.
///
/// Names not starting with `phs<digits>.` are ignored; any that do must parse.
pub fn discover_metadata_files(dir: &Path) -> Result<FileGroups> {
    let mut groups = FileGroups::new();
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .map(|e| e.map(|e| e.path()))
        .collect::<std::io::Result<_>>()?;
    entries.sort();

    for path in entries {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else { continue };
        let looks_like_study = name
            .strip_prefix("phs")
            .and_then(|rest| rest.split_once('.'))
            .is_some_and(|(digits, _)| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()));
        if !looks_like_study || !path.is_file() {
            continue;
        }
        groups.insert(MetadataFile::parse(&path)?)?;
    }

    tracing::info!(
        dir = %dir.display(),
        studies = groups.studies.len(),
        files = groups.files().count(),
        "found dbGaP metadata files"
    );
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(name: &str) -> Result<MetadataFile> {
        MetadataFile::parse(Path::new(name))
    }

    #[test]
    fn test_parse_data_dict() {
        let f = parse("phs000424.v7.pht002742.v7.GTEx_Subject_Phenotypes.data_dict.xml").unwrap();
        assert_eq!(f.study_id, "phs000424.v7");
        assert_eq!(f.table_id.as_deref(), Some("pht002742.v7"));
        assert_eq!(f.sub_name, "GTEx");
        assert_eq!(f.record_type, RecordType::SubjectPhenotypes);
        assert_eq!(f.file_type, FileType::DataDict);
        assert_eq!(f.consent, None);
    }

    #[test]
    fn test_parse_var_report_with_participant_set() {
        let f = parse("phs000424.v7.pht002741.v7.p2.GTEx_Sample.var_report.xml").unwrap();
        assert_eq!(f.sub_name, "GTEx");
        assert_eq!(f.record_type, RecordType::Sample);
        assert_eq!(f.file_type, FileType::VarReport);
    }

    #[test]
    fn test_parse_restricted_table() {
        let f = parse("phs000956.v3.pht005002.v1.p1.c2.TOPMed_WGS_Amish_Subject.HMB-IRB-MDS.txt").unwrap();
        assert_eq!(f.sub_name, "TOPMed_WGS_Amish");
        assert_eq!(f.record_type, RecordType::Subject);
        assert_eq!(f.file_type, FileType::Table);
        assert_eq!(f.consent_suffix(), Some(".c2"));
        assert_eq!(f.consent.unwrap().abbreviation.as_deref(), Some("HMB-IRB-MDS"));
    }

    #[test]
    fn test_parse_sample_attributes_not_sample() {
        let f = parse("phs000001.v1.Foo_Sample_Attributes.data_dict.xml").unwrap();
        assert_eq!(f.record_type, RecordType::SampleAttributes);
        assert_eq!(f.sub_name, "Foo");
    }

    #[test]
    fn test_parse_rejects_unknown_shapes() {
        assert!(matches!(parse("phs000001.v1.Foo_Widget.data_dict.xml"), Err(Error::StructuralParse { .. })));
        assert!(matches!(parse("phs000001.v1.Foo_Subject.summary.xml"), Err(Error::StructuralParse { .. })));
        assert!(matches!(parse("phs000001.Foo_Subject.data_dict.xml"), Err(Error::StructuralParse { .. })));
    }

    #[test]
    fn test_duplicate_xml_slot_rejected() {
        let mut groups = FileGroups::new();
        groups.insert(parse("phs000001.v1.pht000001.v1.Foo_Subject.data_dict.xml").unwrap()).unwrap();
        let dup = groups.insert(parse("phs000001.v1.pht000009.v1.Foo_Subject.data_dict.xml").unwrap());
        assert!(matches!(dup, Err(Error::DuplicateKey { .. })));
    }

    #[test]
    fn test_tables_group_by_consent() {
        let mut groups = FileGroups::new();
        groups.insert(parse("phs000001.v1.pht1.v1.p1.c1.Foo_Subject.GRU.txt").unwrap()).unwrap();
        groups.insert(parse("phs000001.v1.pht1.v1.p1.c2.Foo_Subject.HMB.txt").unwrap()).unwrap();
        assert_eq!(groups.files().count(), 2);
        let again = groups.insert(parse("phs000001.v1.pht1.v1.p1.c2.Foo_Subject.HMB.txt").unwrap());
        assert!(again.is_err());
    }
}
