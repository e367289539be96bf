//! Closed registry of DATS node kinds.
//!
//! Every node in the output graph is one of these kinds. The table is fixed
//! at compile time: kind → (type name, JSON schema file, needs `@context`).

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Where the JSON-LD context documents for DATS live.
pub const DEFAULT_CONTEXT_PREFIX: &str =
    "https://raw.githubusercontent.com/datatagsuite/context/master/sdo/";

/// Static metadata for one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindInfo {
    pub name: &'static str,
    pub schema: &'static str,
    pub has_context: bool,
}

/// A DATS object type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeKind {
    Access,
    Activity,
    AlternateIdentifier,
    AnatomicalPart,
    Annotation,
    BiologicalEntity,
    CategoryValuesPair,
    DataAcquisition,
    DataAnalysis,
    DataRepository,
    DataStandard,
    DataType,
    Dataset,
    DatasetDistribution,
    Date,
    Dimension,
    Disease,
    Grant,
    Identifier,
    Instrument,
    License,
    Material,
    MolecularEntity,
    Organization,
    Person,
    Place,
    Provenance,
    Publication,
    RelatedIdentifier,
    Software,
    Study,
    StudyGroup,
    TaxonomicInformation,
    Treatment,
}

const fn info(name: &'static str, schema: &'static str, has_context: bool) -> KindInfo {
    KindInfo { name, schema, has_context }
}

// Indexed by `NodeKind as usize`; order must match the enum.
static KIND_TABLE: [KindInfo; 34] = [
    info("Access", "access_schema.json", false),
    info("Activity", "activity_schema.json", false),
    info("AlternateIdentifier", "alternate_identifier_info_schema.json", false),
    info("AnatomicalPart", "anatomical_part_schema.json", false),
    info("Annotation", "annotation_schema.json", false),
    info("BiologicalEntity", "biological_entity_schema.json", false),
    info("CategoryValuesPair", "category_values_pair_schema.json", false),
    info("DataAcquisition", "data_acquisition_schema.json", false),
    info("DataAnalysis", "data_analysis_schema.json", false),
    info("DataRepository", "data_repository_schema.json", true),
    info("DataStandard", "data_standard_schema.json", true),
    info("DataType", "data_type_schema.json", false),
    info("Dataset", "dataset_schema.json", true),
    info("DatasetDistribution", "dataset_distribution_schema.json", true),
    info("Date", "date_info_schema.json", false),
    info("Dimension", "dimension_schema.json", false),
    info("Disease", "disease_schema.json", false),
    info("Grant", "grant_schema.json", true),
    info("Identifier", "identifier_info_schema.json", false),
    info("Instrument", "instrument_schema.json", false),
    info("License", "license_schema.json", false),
    info("Material", "material_schema.json", true),
    info("MolecularEntity", "molecular_entity_schema.json", false),
    info("Organization", "organization_schema.json", true),
    info("Person", "person_schema.json", true),
    info("Place", "place_schema.json", false),
    info("Provenance", "provenance_schema.json", false),
    info("Publication", "publication_schema.json", true),
    info("RelatedIdentifier", "related_identifier_info_schema.json", false),
    info("Software", "software_schema.json", true),
    info("Study", "study_schema.json", false),
    info("StudyGroup", "study_group_schema.json", false),
    info("TaxonomicInformation", "taxonomic_info_schema.json", false),
    info("Treatment", "treatment_schema.json", false),
];

impl NodeKind {
    pub const ALL: [NodeKind; 34] = [
        NodeKind::Access,
        NodeKind::Activity,
        NodeKind::AlternateIdentifier,
        NodeKind::AnatomicalPart,
        NodeKind::Annotation,
        NodeKind::BiologicalEntity,
        NodeKind::CategoryValuesPair,
        NodeKind::DataAcquisition,
        NodeKind::DataAnalysis,
        NodeKind::DataRepository,
        NodeKind::DataStandard,
        NodeKind::DataType,
        NodeKind::Dataset,
        NodeKind::DatasetDistribution,
        NodeKind::Date,
        NodeKind::Dimension,
        NodeKind::Disease,
        NodeKind::Grant,
        NodeKind::Identifier,
        NodeKind::Instrument,
        NodeKind::License,
        NodeKind::Material,
        NodeKind::MolecularEntity,
        NodeKind::Organization,
        NodeKind::Person,
        NodeKind::Place,
        NodeKind::Provenance,
        NodeKind::Publication,
        NodeKind::RelatedIdentifier,
        NodeKind::Software,
        NodeKind::Study,
        NodeKind::StudyGroup,
        NodeKind::TaxonomicInformation,
        NodeKind::Treatment,
    ];

    pub fn info(self) -> &'static KindInfo {
        &KIND_TABLE[self as usize]
    }

    /// The `@type` value.
    pub fn name(self) -> &'static str {
        self.info().name
    }

    /// Look up a kind by its DATS type name.
    pub fn from_name(name: &str) -> Result<NodeKind> {
        NodeKind::ALL
            .iter()
            .copied()
            .find(|k| k.name() == name)
            .ok_or_else(|| Error::UnknownKind(name.to_string()))
    }

    /// The `@context` URI for kinds that carry one.
    pub fn context_uri(self, prefix: &str) -> Option<String> {
        let info = self.info();
        if !info.has_context {
            return None;
        }
        let stem = info.schema.strip_suffix("_schema.json").unwrap_or(info.schema);
        Some(format!("{prefix}{stem}_context.jsonld"))
    }

    /// The Access schema declares no `@id`, so exported Access objects omit it.
    pub fn emits_id(self) -> bool {
        self != NodeKind::Access
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
