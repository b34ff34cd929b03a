//! CSV loaders for the three open-data extracts.
//!
//! All sources are semicolon-delimited with a header row that may carry a
//! UTF-8 BOM. The effectifs and IPS extracts exist in several vintages with
//! different header spellings, so those loaders resolve column positions
//! once per file through alias tables before any row is read. A column that
//! cannot be resolved simply reads as the empty string, which makes the
//! corresponding filter match nothing instead of failing the run.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use csv::{Reader, ReaderBuilder, StringRecord};
use log::{debug, warn};
use once_cell::sync::Lazy;

use crate::types::{SchoolHeadcountRecord, SchoolIndicatorRow, SchoolSocialIndex};
use crate::util::{pad_code, parse_f64_safe, parse_i64_safe, strip_bom};

/// Row counters reported by each loader, for console diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadStats {
    pub rows_read: usize,
    pub rows_kept: usize,
}

// Indicator extract column names. This dataset has a single known schema,
// so no alias table is needed on this side.
const IND_UAI: &str = "Identifiant de l'établissement";
const IND_NOM: &str = "Nom de l'établissement";
const IND_DEPARTEMENT: &str = "Code département";
const IND_ACADEMIE: &str = "Libellé académie";
const IND_SECTEUR: &str = "Secteur";
const IND_NATURE: &str = "Nature de l'établissement";
const IND_AED_ETP: &str = "ETP de personnels de vie scolaire";
const IND_PROF_ETP: &str = "ETP d'enseignants";
const IND_ANNEE: &str = "Rentrée scolaire";

// Accepted header spellings per semantic field, ordered by preference.
// The snake_case names come from the older effectifs vintage, the accented
// ones from the current opendata portal export.
const EFF_ANNEE: &[&str] = &["Annee_scolaire", "Rentrée scolaire", "rentree_scolaire"];
const EFF_DEPARTEMENT: &[&str] = &["Code_departement", "Code département", "code_departement"];
const EFF_ACADEMIE: &[&str] = &["Academie", "Académie", "Libellé académie"];
const EFF_TYPE: &[&str] = &["Type_d_etablissement", "Type d'établissement", "type_detablissement"];
const EFF_SECTEUR: &[&str] = &["Secteur_d_enseignement", "Secteur", "secteur_d_enseignement"];
const EFF_UAI: &[&str] = &[
    "Numero_d_etablissement",
    "Numéro de l'établissement",
    "numero_d_etablissement",
    "UAI",
];
const EFF_ELEVES: &[&str] = &["Nombre_d_eleves", "Nombre d'élèves", "Nombre total d'élèves"];
const EFF_COMMUNE: &[&str] = &["localite_acheminement", "Libellé commune", "Commune"];
const EFF_ULIS: &[&str] = &["Nombre_d_eleves_ULIS", "Nombre d'élèves ULIS", "ULIS"];
const EFF_SEGPA: &[&str] = &["Nombre_d_eleves_SEGPA", "Nombre d'élèves SEGPA", "SEGPA"];

static EFFECTIFS_ALIASES: Lazy<HashMap<&'static str, &'static [&'static str]>> =
    Lazy::new(|| {
        HashMap::from([
            ("annee", EFF_ANNEE),
            ("departement", EFF_DEPARTEMENT),
            ("academie", EFF_ACADEMIE),
            ("type", EFF_TYPE),
            ("secteur", EFF_SECTEUR),
            ("uai", EFF_UAI),
            ("eleves", EFF_ELEVES),
            ("commune", EFF_COMMUNE),
            ("ulis", EFF_ULIS),
            ("segpa", EFF_SEGPA),
        ])
    });

const IPS_ANNEE: &[&str] = &["Rentrée scolaire", "rentree_scolaire", "Annee_scolaire"];
const IPS_DEPARTEMENT: &[&str] = &[
    "Code du département",
    "Code département",
    "code_du_departement",
    "Département",
];
const IPS_ACADEMIE: &[&str] = &["Académie", "Academie", "academie", "Libellé académie"];
const IPS_SECTEUR: &[&str] = &["Secteur", "secteur"];
const IPS_UAI: &[&str] = &["UAI", "uai", "Code UAI"];
const IPS_IPS: &[&str] = &["IPS", "ips", "Indice de position sociale"];
const IPS_ECART: &[&str] = &[
    "Ecart-type de l'IPS",
    "Écart-type de l'IPS",
    "ecart_type_de_l_ips",
];

static IPS_ALIASES: Lazy<HashMap<&'static str, &'static [&'static str]>> = Lazy::new(|| {
    HashMap::from([
        ("annee", IPS_ANNEE),
        ("departement", IPS_DEPARTEMENT),
        ("academie", IPS_ACADEMIE),
        ("secteur", IPS_SECTEUR),
        ("uai", IPS_UAI),
        ("ips", IPS_IPS),
        ("ecart_type", IPS_ECART),
    ])
});

/// Header row with the BOM stripped from the first cell, supporting lookup
/// by exact name or by alias list.
struct Header {
    names: Vec<String>,
}

impl Header {
    fn from_record(rec: &StringRecord) -> Self {
        let names = rec
            .iter()
            .enumerate()
            .map(|(i, h)| {
                if i == 0 {
                    strip_bom(h).to_string()
                } else {
                    h.to_string()
                }
            })
            .collect();
        Header { names }
    }

    fn is_empty(&self) -> bool {
        self.names.iter().all(|n| n.trim().is_empty())
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// First alias present in this header, resolved once per file.
    fn resolve(&self, table: &HashMap<&'static str, &'static [&'static str]>, field: &str) -> Option<usize> {
        table
            .get(field)
            .and_then(|aliases| aliases.iter().find_map(|a| self.index_of(a)))
    }
}

/// Field accessor: absent columns and short records read as empty.
fn field<'r>(rec: &'r StringRecord, idx: Option<usize>) -> &'r str {
    idx.and_then(|i| rec.get(i)).unwrap_or("")
}

fn non_empty(s: &str) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn open_semicolon_csv(path: &Path) -> Result<Reader<std::fs::File>> {
    ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))
}

/// Load the staffing-indicator rows for one department/academy.
///
/// A row survives iff the department code matches exactly (no padding),
/// the academy matches case-insensitively, the sector is `public` and the
/// establishment nature starts with `nature_prefix`. Field values are kept
/// verbatim.
pub fn load_indicateurs(
    path: &Path,
    departement: &str,
    academie: &str,
    nature_prefix: &str,
) -> Result<(Vec<SchoolIndicatorRow>, LoadStats)> {
    let mut rdr = open_semicolon_csv(path)?;
    let header = Header::from_record(
        rdr.headers()
            .with_context(|| format!("failed to read header of {}", path.display()))?,
    );
    if header.is_empty() {
        warn!(
            "{}: empty header row, no indicator rows will match",
            path.display()
        );
        return Ok((Vec::new(), LoadStats::default()));
    }

    let col_uai = header.index_of(IND_UAI);
    let col_nom = header.index_of(IND_NOM);
    let col_departement = header.index_of(IND_DEPARTEMENT);
    let col_academie = header.index_of(IND_ACADEMIE);
    let col_secteur = header.index_of(IND_SECTEUR);
    let col_nature = header.index_of(IND_NATURE);
    let col_aed = header.index_of(IND_AED_ETP);
    let col_prof = header.index_of(IND_PROF_ETP);
    let col_annee = header.index_of(IND_ANNEE);

    let academie_upper = academie.to_uppercase();
    let prefix_lower = nature_prefix.to_lowercase();

    let mut rows = Vec::new();
    let mut stats = LoadStats::default();
    for result in rdr.records() {
        let rec = result.with_context(|| format!("malformed record in {}", path.display()))?;
        stats.rows_read += 1;
        if field(&rec, col_departement) != departement {
            continue;
        }
        if field(&rec, col_academie).to_uppercase() != academie_upper {
            continue;
        }
        if field(&rec, col_secteur).trim().to_lowercase() != "public" {
            continue;
        }
        if !field(&rec, col_nature)
            .trim()
            .to_lowercase()
            .starts_with(&prefix_lower)
        {
            continue;
        }
        rows.push(SchoolIndicatorRow {
            uai: field(&rec, col_uai).to_string(),
            nom: field(&rec, col_nom).to_string(),
            secteur: field(&rec, col_secteur).to_string(),
            nature: field(&rec, col_nature).to_string(),
            aed_etp: field(&rec, col_aed).to_string(),
            prof_etp: field(&rec, col_prof).to_string(),
            annee: field(&rec, col_annee).to_string(),
        });
    }
    stats.rows_kept = rows.len();
    Ok((rows, stats))
}

/// Load the headcount extract, keeping per UAI only the most recent school
/// year (string comparison; a strictly greater year replaces the retained
/// row, ties keep the earlier one).
///
/// Department codes are zero-padded to 3 characters on both sides before
/// comparison, so `44` matches a row carrying `044`.
pub fn load_effectifs_latest(
    path: &Path,
    departement: &str,
    academie: &str,
) -> Result<(HashMap<String, SchoolHeadcountRecord>, LoadStats)> {
    let mut rdr = open_semicolon_csv(path)?;
    let header = Header::from_record(
        rdr.headers()
            .with_context(|| format!("failed to read header of {}", path.display()))?,
    );
    if header.is_empty() {
        warn!(
            "{}: empty header row, no headcount rows will match",
            path.display()
        );
        return Ok((HashMap::new(), LoadStats::default()));
    }

    // The year column falls back to the first column: the oldest vintage
    // only differs from the known names by its BOM prefix.
    let col_annee = header.resolve(&EFFECTIFS_ALIASES, "annee").or(Some(0));
    let col_departement = header.resolve(&EFFECTIFS_ALIASES, "departement");
    let col_academie = header.resolve(&EFFECTIFS_ALIASES, "academie");
    let col_type = header.resolve(&EFFECTIFS_ALIASES, "type");
    let col_secteur = header.resolve(&EFFECTIFS_ALIASES, "secteur");
    let col_uai = header.resolve(&EFFECTIFS_ALIASES, "uai");
    let col_eleves = header.resolve(&EFFECTIFS_ALIASES, "eleves");
    let col_commune = header.resolve(&EFFECTIFS_ALIASES, "commune");
    let col_ulis = header.resolve(&EFFECTIFS_ALIASES, "ulis");
    let col_segpa = header.resolve(&EFFECTIFS_ALIASES, "segpa");

    let departement_padded = pad_code(departement, 3);
    let academie_upper = academie.to_uppercase();

    let mut latest: HashMap<String, SchoolHeadcountRecord> = HashMap::new();
    let mut stats = LoadStats::default();
    for result in rdr.records() {
        let rec = result.with_context(|| format!("malformed record in {}", path.display()))?;
        stats.rows_read += 1;
        if pad_code(field(&rec, col_departement), 3) != departement_padded {
            continue;
        }
        if field(&rec, col_academie).to_uppercase() != academie_upper {
            continue;
        }
        if field(&rec, col_type).trim().to_uppercase() != "COLLEGE" {
            continue;
        }
        if field(&rec, col_secteur).trim().to_lowercase() != "public" {
            continue;
        }
        let uai = field(&rec, col_uai);
        if uai.is_empty() {
            continue;
        }
        let annee = field(&rec, col_annee).to_string();
        if let Some(prev) = latest.get(uai) {
            if annee <= prev.annee {
                continue;
            }
        }
        latest.insert(
            uai.to_string(),
            SchoolHeadcountRecord {
                annee,
                eleves: parse_i64_safe(field(&rec, col_eleves)),
                commune: non_empty(field(&rec, col_commune)),
                ulis: parse_i64_safe(field(&rec, col_ulis)),
                segpa: parse_i64_safe(field(&rec, col_segpa)),
            },
        );
    }
    stats.rows_kept = latest.len();
    Ok((latest, stats))
}

/// Load the optional social-position-index extract, keyed by UAI.
///
/// With no path this is a no-op returning an empty map. Department codes
/// match when the row equals the argument padded to either 2 or 3
/// characters, because the published vintages disagree on padding — this
/// intentionally differs from the headcount comparison. Rows whose sector
/// starts with `priv` are excluded; later duplicates of a UAI overwrite
/// earlier ones (file order).
pub fn load_ips(
    path: Option<&Path>,
    departement: &str,
    academie: &str,
) -> Result<(HashMap<String, SchoolSocialIndex>, LoadStats)> {
    let Some(path) = path else {
        debug!("no IPS file supplied, social-index fields will be empty");
        return Ok((HashMap::new(), LoadStats::default()));
    };
    let mut rdr = open_semicolon_csv(path)?;
    let header = Header::from_record(
        rdr.headers()
            .with_context(|| format!("failed to read header of {}", path.display()))?,
    );
    if header.is_empty() {
        warn!("{}: empty header row, no IPS rows will match", path.display());
        return Ok((HashMap::new(), LoadStats::default()));
    }

    let col_annee = header.resolve(&IPS_ALIASES, "annee").or(Some(0));
    let col_departement = header.resolve(&IPS_ALIASES, "departement");
    let col_academie = header.resolve(&IPS_ALIASES, "academie");
    let col_secteur = header.resolve(&IPS_ALIASES, "secteur");
    let col_uai = header.resolve(&IPS_ALIASES, "uai");
    let col_ips = header.resolve(&IPS_ALIASES, "ips");
    let col_ecart = header.resolve(&IPS_ALIASES, "ecart_type");

    let dep2 = pad_code(departement, 2);
    let dep3 = pad_code(departement, 3);
    let academie_upper = academie.to_uppercase();

    let mut map: HashMap<String, SchoolSocialIndex> = HashMap::new();
    let mut stats = LoadStats::default();
    for result in rdr.records() {
        let rec = result.with_context(|| format!("malformed record in {}", path.display()))?;
        stats.rows_read += 1;
        let dep = field(&rec, col_departement);
        if dep != dep2 && dep != dep3 {
            continue;
        }
        if field(&rec, col_academie).to_uppercase() != academie_upper {
            continue;
        }
        if field(&rec, col_secteur)
            .trim()
            .to_lowercase()
            .starts_with("priv")
        {
            continue;
        }
        let uai = field(&rec, col_uai);
        if uai.is_empty() {
            continue;
        }
        map.insert(
            uai.to_string(),
            SchoolSocialIndex {
                ips: parse_f64_safe(field(&rec, col_ips)),
                ecart_type: parse_f64_safe(field(&rec, col_ecart)),
                annee: field(&rec, col_annee).to_string(),
            },
        );
    }
    stats.rows_kept = map.len();
    Ok((map, stats))
}
