//! Join of the three sources by UAI and dataset-wide statistics.

use std::collections::HashMap;

use crate::types::{
    MergedSchoolRecord, SchoolHeadcountRecord, SchoolIndicatorRow, SchoolSocialIndex,
    SummaryStats,
};
use crate::util::{average, parse_f64_safe, round_to, title_case};

/// Left-join headcount and social-index records onto the indicator rows,
/// preserving indicator order. A missing join side yields `None` fields;
/// a present-but-unparsable ETP value yields `None`, never an error.
pub fn merge_records(
    indicateurs: &[SchoolIndicatorRow],
    effectifs: &HashMap<String, SchoolHeadcountRecord>,
    ips: &HashMap<String, SchoolSocialIndex>,
) -> Vec<MergedSchoolRecord> {
    indicateurs
        .iter()
        .map(|r| {
            let eff = effectifs.get(&r.uai);
            let soc = ips.get(&r.uai);
            let aed_etp = parse_f64_safe(&r.aed_etp);
            let prof_etp = parse_f64_safe(&r.prof_etp);
            let eleves = eff.and_then(|e| e.eleves);
            // Exact quotient, only when both operands exist and the ETP
            // denominator is strictly positive.
            let ratio = match (aed_etp, eleves) {
                (Some(etp), Some(n)) if etp > 0.0 => Some(n as f64 / etp),
                _ => None,
            };
            MergedSchoolRecord {
                uai: r.uai.clone(),
                nom: title_case(&r.nom),
                aed_etp,
                prof_etp,
                eleves,
                secteur: r.secteur.clone(),
                effectifs_annee: eff.map(|e| e.annee.clone()),
                commune: eff.and_then(|e| e.commune.clone()),
                ulis: eff.and_then(|e| e.ulis),
                segpa: eff.and_then(|e| e.segpa),
                ips: soc.and_then(|s| s.ips),
                ips_ecart_type: soc.and_then(|s| s.ecart_type),
                ratio,
            }
        })
        .collect()
}

/// sum / mean / min / max over the non-null values, rounded; all `None`
/// when no non-null value exists.
fn float_stats(
    values: &[f64],
    decimals: u32,
) -> (Option<f64>, Option<f64>, Option<f64>, Option<f64>) {
    if values.is_empty() {
        return (None, None, None, None);
    }
    let total: f64 = values.iter().sum();
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    (
        Some(round_to(total, decimals)),
        Some(round_to(average(values), decimals)),
        Some(round_to(min, decimals)),
        Some(round_to(max, decimals)),
    )
}

fn int_total<I>(values: I) -> Option<i64>
where
    I: Iterator<Item = Option<i64>>,
{
    let mut sum = 0i64;
    let mut seen = false;
    for v in values.flatten() {
        sum += v;
        seen = true;
    }
    seen.then_some(sum)
}

/// Dataset-wide aggregates over the merged records.
///
/// The source-year fields capture the first non-null year per source in
/// input row order, so the result does not depend on map iteration order.
pub fn compute_summary(
    records: &[MergedSchoolRecord],
    indicateurs: &[SchoolIndicatorRow],
    ips: &HashMap<String, SchoolSocialIndex>,
) -> SummaryStats {
    let aed: Vec<f64> = records.iter().filter_map(|r| r.aed_etp).collect();
    let prof: Vec<f64> = records.iter().filter_map(|r| r.prof_etp).collect();
    let ips_values: Vec<f64> = records.iter().filter_map(|r| r.ips).collect();

    let (aed_total, aed_moyen, aed_min, aed_max) = float_stats(&aed, 2);
    let (prof_total, prof_moyen, prof_min, prof_max) = float_stats(&prof, 2);
    let (_, ips_moyen, ips_min, ips_max) = float_stats(&ips_values, 1);

    let annee_indicateurs = indicateurs
        .iter()
        .map(|r| r.annee.trim())
        .find(|a| !a.is_empty())
        .map(str::to_string);
    let annee_effectifs = records
        .iter()
        .filter_map(|r| r.effectifs_annee.as_deref())
        .map(str::trim)
        .find(|a| !a.is_empty())
        .map(str::to_string);
    let annee_ips = indicateurs
        .iter()
        .filter_map(|r| ips.get(&r.uai))
        .map(|s| s.annee.trim())
        .find(|a| !a.is_empty())
        .map(str::to_string);

    SummaryStats {
        nb_colleges: records.len(),
        aed_total,
        aed_moyen,
        aed_min,
        aed_max,
        prof_total,
        prof_moyen,
        prof_min,
        prof_max,
        eleves_total: int_total(records.iter().map(|r| r.eleves)),
        ulis_total: int_total(records.iter().map(|r| r.ulis)),
        segpa_total: int_total(records.iter().map(|r| r.segpa)),
        ips_moyen,
        ips_min,
        ips_max,
        annee_indicateurs,
        annee_effectifs,
        annee_ips,
    }
}
