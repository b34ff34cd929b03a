// tests/dashboard_e2e.rs
//
// Drives the whole pipeline over small CSV fixtures: load the three
// extracts, merge, render and write the dashboard, then check the figures
// that end up embedded in the document.
use std::fs;
use std::path::PathBuf;

use aed_dashboard::loader;
use aed_dashboard::merge;
use aed_dashboard::output;
use aed_dashboard::render::{self, ReportMeta};

fn tmp_dir(name: &str) -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!("aed_dashboard_e2e_{}_{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&p);
    fs::create_dir_all(&p).unwrap();
    p
}

const IND_HEADER: &str = "Identifiant de l'établissement;Nom de l'établissement;Code département;Libellé académie;Secteur;Nature de l'établissement;ETP de personnels de vie scolaire;ETP d'enseignants;Rentrée scolaire";
const EFF_HEADER: &str = "\u{feff}Annee_scolaire;Code_departement;Academie;Type_d_etablissement;Secteur_d_enseignement;Numero_d_etablissement;Nombre_d_eleves;localite_acheminement;Nombre_d_eleves_ULIS;Nombre_d_eleves_SEGPA";
const IPS_HEADER: &str = "Rentrée scolaire;Académie;Code du département;UAI;Secteur;IPS;Ecart-type de l'IPS";

fn meta(dir: &std::path::Path, with_ips: bool) -> ReportMeta {
    ReportMeta {
        departement: "44".to_string(),
        departement_label: "Loire-Atlantique".to_string(),
        academie: "NANTES".to_string(),
        indicateurs_file: "indicateurs.csv".to_string(),
        effectifs_file: "effectifs.csv".to_string(),
        ips_file: with_ips.then(|| "ips.csv".to_string()),
        top_n: 10,
        generated_at: format!("fixture run in {}", dir.display()),
    }
}

#[test]
fn full_pipeline_with_all_three_sources() {
    let dir = tmp_dir("full");
    let ind_path = dir.join("indicateurs.csv");
    let eff_path = dir.join("effectifs.csv");
    let ips_path = dir.join("ips.csv");
    let out_path = dir.join("dashboard.html");

    // School A has everything; school B has an empty ETP and no headcount
    // row; the extra rows must be filtered out.
    fs::write(
        &ind_path,
        format!(
            "{IND_HEADER}\n\
             0440001A;COLLEGE ALPHA;44;NANTES;PUBLIC;COLLÈGE;12.5;32.0;2024\n\
             0440002B;COLLEGE BETA;44;NANTES;PUBLIC;COLLÈGE;;;2024\n\
             0490001X;COLLEGE GAMMA;49;NANTES;PUBLIC;COLLÈGE;6.0;20.0;2024\n"
        ),
    )
    .unwrap();
    fs::write(
        &eff_path,
        format!(
            "{EFF_HEADER}\n\
             2022;044;NANTES;COLLEGE;PUBLIC;0440001A;280;NANTES;9;6\n\
             2023;044;NANTES;COLLEGE;PUBLIC;0440001A;300;NANTES;10;7\n"
        ),
    )
    .unwrap();
    fs::write(
        &ips_path,
        format!(
            "{IPS_HEADER}\n\
             2023;NANTES;044;0440001A;public;104.3;28.1\n\
             2023;NANTES;044;0440009Z;privé sous contrat;120.0;22.0\n"
        ),
    )
    .unwrap();

    let (ind_rows, _) =
        loader::load_indicateurs(&ind_path, "44", "NANTES", "collège").unwrap();
    assert_eq!(ind_rows.len(), 2);
    let (eff_map, _) = loader::load_effectifs_latest(&eff_path, "44", "NANTES").unwrap();
    let (ips_map, _) = loader::load_ips(Some(&ips_path), "44", "NANTES").unwrap();
    assert_eq!(ips_map.len(), 1);

    let records = merge::merge_records(&ind_rows, &eff_map, &ips_map);
    let summary = merge::compute_summary(&records, &ind_rows, &ips_map);

    let a = &records[0];
    assert_eq!(a.nom, "College Alpha");
    assert_eq!(a.eleves, Some(300));
    assert_eq!(a.effectifs_annee.as_deref(), Some("2023"));
    assert_eq!(a.ratio, Some(24.0));
    assert_eq!(a.ips, Some(104.3));
    let b = &records[1];
    assert_eq!(b.aed_etp, None);
    assert_eq!(b.ratio, None);

    assert_eq!(summary.nb_colleges, 2);
    assert_eq!(summary.aed_total, Some(12.5));
    assert_eq!(summary.eleves_total, Some(300));
    assert_eq!(summary.ulis_total, Some(10));
    assert_eq!(summary.segpa_total, Some(7));
    assert_eq!(summary.ips_moyen, Some(104.3));
    assert_eq!(summary.annee_effectifs.as_deref(), Some("2023"));
    assert_eq!(summary.annee_ips.as_deref(), Some("2023"));

    let html = render::render_dashboard(&records, &summary, &meta(&dir, true)).unwrap();
    output::write_text(&out_path, &html).unwrap();
    let written = fs::read_to_string(&out_path).unwrap();
    assert!(written.contains(r#""aed_total": 12.5"#));
    assert!(written.contains(r#""eleves_total": 300"#));
    assert!(written.contains(r#""ratio": 24.0"#));
    assert!(written.contains("College Alpha"));
    assert!(written.contains("ips.csv"));
}

#[test]
fn pipeline_without_social_index_source() {
    let dir = tmp_dir("no_ips");
    let ind_path = dir.join("indicateurs.csv");
    let eff_path = dir.join("effectifs.csv");
    let out_path = dir.join("dashboard.html");

    fs::write(
        &ind_path,
        format!(
            "{IND_HEADER}\n\
             0440001A;COLLEGE ALPHA;44;NANTES;PUBLIC;COLLÈGE;12.5;32.0;2024\n"
        ),
    )
    .unwrap();
    fs::write(
        &eff_path,
        format!(
            "{EFF_HEADER}\n\
             2023;044;NANTES;COLLEGE;PUBLIC;0440001A;300;NANTES;;\n"
        ),
    )
    .unwrap();

    let (ind_rows, _) =
        loader::load_indicateurs(&ind_path, "44", "NANTES", "collège").unwrap();
    let (eff_map, _) = loader::load_effectifs_latest(&eff_path, "44", "NANTES").unwrap();
    let (ips_map, _) = loader::load_ips(None, "44", "NANTES").unwrap();
    assert!(ips_map.is_empty());

    let records = merge::merge_records(&ind_rows, &eff_map, &ips_map);
    let summary = merge::compute_summary(&records, &ind_rows, &ips_map);
    assert!(records.iter().all(|r| r.ips.is_none() && r.ips_ecart_type.is_none()));
    assert_eq!(summary.ips_moyen, None);
    assert_eq!(summary.ips_min, None);
    assert_eq!(summary.ips_max, None);

    let html = render::render_dashboard(&records, &summary, &meta(&dir, false)).unwrap();
    output::write_text(&out_path, &html).unwrap();
    let written = fs::read_to_string(&out_path).unwrap();
    assert!(written.contains(r#""ips_moyen": null"#));
    assert!(!written.contains("ips.csv"));
}

#[test]
fn indicator_department_comparison_is_exact_while_headcount_pads() {
    let dir = tmp_dir("padding");
    let ind_path = dir.join("indicateurs.csv");
    let eff_path = dir.join("effectifs.csv");

    // The same school appears with a 3-digit department code in both files:
    // the indicator side must reject it, the headcount side must accept it.
    fs::write(
        &ind_path,
        format!(
            "{IND_HEADER}\n\
             0440001A;COLLEGE ALPHA;044;NANTES;PUBLIC;COLLÈGE;12.5;32.0;2024\n"
        ),
    )
    .unwrap();
    fs::write(
        &eff_path,
        format!(
            "{EFF_HEADER}\n\
             2023;044;NANTES;COLLEGE;PUBLIC;0440001A;300;NANTES;;\n"
        ),
    )
    .unwrap();

    let (ind_rows, _) =
        loader::load_indicateurs(&ind_path, "44", "NANTES", "collège").unwrap();
    assert!(ind_rows.is_empty());
    let (eff_map, _) = loader::load_effectifs_latest(&eff_path, "44", "NANTES").unwrap();
    assert_eq!(eff_map.len(), 1);
}
