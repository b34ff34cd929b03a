use serde::Serialize;
use tabled::Tabled;

use crate::util::{format_int, format_number};

/// One qualifying row of the staffing-indicator extract.
///
/// The ETP fields are kept as raw strings; the merge step parses them so
/// that a present-but-empty value can become `None` instead of an error.
#[derive(Debug, Clone)]
pub struct SchoolIndicatorRow {
    pub uai: String,
    pub nom: String,
    pub secteur: String,
    pub nature: String,
    pub aed_etp: String,
    pub prof_etp: String,
    pub annee: String,
}

/// Most recent headcount row retained for one UAI.
#[derive(Debug, Clone, PartialEq)]
pub struct SchoolHeadcountRecord {
    pub annee: String,
    pub eleves: Option<i64>,
    pub commune: Option<String>,
    pub ulis: Option<i64>,
    pub segpa: Option<i64>,
}

/// Social-position index row for one UAI.
#[derive(Debug, Clone, PartialEq)]
pub struct SchoolSocialIndex {
    pub ips: Option<f64>,
    pub ecart_type: Option<f64>,
    pub annee: String,
}

/// Left-join of one indicator row with its headcount and social-index
/// records. Serialized as-is into the dashboard's embedded JSON block, so
/// field names here are also the keys the client-side script reads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedSchoolRecord {
    pub uai: String,
    pub nom: String,
    pub aed_etp: Option<f64>,
    pub prof_etp: Option<f64>,
    pub eleves: Option<i64>,
    pub secteur: String,
    pub effectifs_annee: Option<String>,
    pub commune: Option<String>,
    pub ulis: Option<i64>,
    pub segpa: Option<i64>,
    pub ips: Option<f64>,
    pub ips_ecart_type: Option<f64>,
    pub ratio: Option<f64>,
}

/// Dataset-wide aggregates. Every statistic computed over zero non-null
/// values is `None`, never zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStats {
    pub nb_colleges: usize,
    pub aed_total: Option<f64>,
    pub aed_moyen: Option<f64>,
    pub aed_min: Option<f64>,
    pub aed_max: Option<f64>,
    pub prof_total: Option<f64>,
    pub prof_moyen: Option<f64>,
    pub prof_min: Option<f64>,
    pub prof_max: Option<f64>,
    pub eleves_total: Option<i64>,
    pub ulis_total: Option<i64>,
    pub segpa_total: Option<i64>,
    pub ips_moyen: Option<f64>,
    pub ips_min: Option<f64>,
    pub ips_max: Option<f64>,
    pub annee_indicateurs: Option<String>,
    pub annee_effectifs: Option<String>,
    pub annee_ips: Option<String>,
}

/// Row shape for the console preview table printed after the dashboard is
/// written. Values are pre-formatted, missing ones shown as `n.d.`.
#[derive(Debug, Clone, Tabled)]
pub struct PreviewRow {
    #[tabled(rename = "Collège")]
    pub nom: String,
    #[tabled(rename = "Commune")]
    pub commune: String,
    #[tabled(rename = "ETP vie scolaire")]
    pub aed_etp: String,
    #[tabled(rename = "Élèves")]
    pub eleves: String,
    #[tabled(rename = "Élèves / ETP")]
    pub ratio: String,
}

const ND: &str = "n.d.";

impl From<&MergedSchoolRecord> for PreviewRow {
    fn from(r: &MergedSchoolRecord) -> Self {
        PreviewRow {
            nom: r.nom.clone(),
            commune: r.commune.clone().unwrap_or_else(|| ND.to_string()),
            aed_etp: r
                .aed_etp
                .map(|v| format_number(v, 2))
                .unwrap_or_else(|| ND.to_string()),
            eleves: r.eleves.map(format_int).unwrap_or_else(|| ND.to_string()),
            ratio: r
                .ratio
                .map(|v| format_number(v, 2))
                .unwrap_or_else(|| ND.to_string()),
        }
    }
}
