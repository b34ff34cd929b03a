//! Static HTML dashboard generation.
//!
//! The document is fully self-contained: the merged records and summary are
//! embedded as a JSON block, styling and interactivity are inline, and no
//! external asset is referenced. Sorting, filtering and the bar charts run
//! client-side against the embedded data.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::types::{MergedSchoolRecord, SummaryStats};

/// Descriptive metadata shown in the dashboard header and footer.
#[derive(Debug, Clone)]
pub struct ReportMeta {
    pub departement: String,
    pub departement_label: String,
    pub academie: String,
    pub indicateurs_file: String,
    pub effectifs_file: String,
    pub ips_file: Option<String>,
    pub top_n: usize,
    pub generated_at: String,
}

#[derive(Serialize)]
struct Payload<'a> {
    records: &'a [MergedSchoolRecord],
    summary: &'a SummaryStats,
    top_n: usize,
}

/// Escape text interpolated into element content or attribute values.
fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Make the JSON payload safe inside a `<script>` element: a `</script>`
/// sequence in the data must not terminate the block early.
fn escape_script(s: &str) -> String {
    s.replace("</", "<\\/")
}

const CSS: &str = r##"
    :root {
      color-scheme: light dark;
      --bg: #f6f8fa;
      --card: #ffffff;
      --text: #222;
      --muted: #555;
      --accent: #2563eb;
      --accent-2: #16a34a;
      --border: #dce3ec;
      --shadow: 0 2px 8px rgba(0,0,0,0.08);
      font-family: system-ui, -apple-system, Segoe UI, sans-serif;
    }
    body {
      margin: 0;
      padding: 32px;
      background: var(--bg);
      color: var(--text);
    }
    h1 { margin: 0 0 8px; font-size: 24px; }
    h2 { margin: 24px 0 12px; }
    .grid {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(220px, 1fr));
      gap: 12px;
      margin: 16px 0 24px;
    }
    .card {
      background: var(--card);
      border: 1px solid var(--border);
      border-radius: 10px;
      padding: 14px 16px;
      box-shadow: var(--shadow);
    }
    .muted { color: var(--muted); font-size: 13px; }
    .value { font-size: 22px; font-weight: 700; }
    .bar-chart {
      display: grid;
      gap: 8px;
    }
    .bar {
      display: flex;
      align-items: center;
      gap: 8px;
    }
    .bar-label { width: 220px; font-size: 13px; }
    .bar-track {
      flex: 1;
      background: #e5e7eb;
      border-radius: 8px;
      overflow: hidden;
      height: 14px;
    }
    .bar-fill {
      height: 100%;
      background: linear-gradient(90deg, var(--accent), var(--accent-2));
    }
    table {
      width: 100%;
      border-collapse: collapse;
      font-size: 13px;
    }
    th, td {
      padding: 8px;
      border-bottom: 1px solid var(--border);
      text-align: left;
    }
    th {
      position: sticky;
      top: 0;
      background: var(--card);
      z-index: 1;
    }
    tbody tr:hover { background: rgba(37,99,235,0.08); }
    .container { max-width: 1300px; margin: 0 auto; }
    .top-bar { display: flex; justify-content: space-between; align-items: baseline; gap: 12px; flex-wrap: wrap; }
    .footnote { font-size: 12px; color: var(--muted); margin-top: 12px; }
"##;

const JS: &str = r##"
    const payload = JSON.parse(document.getElementById('data-json').textContent);
    const records = payload.records;
    const summary = payload.summary;
    const topN = payload.top_n;

    const esc = (s) => String(s)
      .replace(/&/g, '&amp;')
      .replace(/</g, '&lt;')
      .replace(/>/g, '&gt;');
    const formatNumber = (n) => n === null || n === undefined ? 'n.d.' : new Intl.NumberFormat('fr-FR').format(n);
    const formatFloat = (n) => n === null || n === undefined ? 'n.d.' : new Intl.NumberFormat('fr-FR', { minimumFractionDigits: 2, maximumFractionDigits: 2 }).format(n);
    const formatFloat1 = (n) => n === null || n === undefined ? 'n.d.' : new Intl.NumberFormat('fr-FR', { minimumFractionDigits: 1, maximumFractionDigits: 1 }).format(n);

    const ratioGlobal = summary.aed_total && summary.eleves_total
      ? summary.eleves_total / summary.aed_total
      : null;

    const cards = [
      { label: 'Collèges publics', value: formatNumber(summary.nb_colleges) },
      { label: 'Total ETP vie scolaire', value: formatFloat(summary.aed_total) },
      { label: 'ETP moyen', value: formatFloat(summary.aed_moyen) },
      { label: 'Min / Max ETP', value: `${formatFloat(summary.aed_min)} / ${formatFloat(summary.aed_max)}` },
      { label: 'Élèves (total)', value: formatNumber(summary.eleves_total) },
      { label: 'Élèves par ETP', value: formatFloat(ratioGlobal) },
      { label: 'IPS moyen', value: formatFloat1(summary.ips_moyen) }
    ];

    const cardsRoot = document.getElementById('cards');
    cardsRoot.innerHTML = cards.map(c => `
      <div class="card">
        <div class="muted">${c.label}</div>
        <div class="value">${c.value}</div>
      </div>
    `).join('');

    const renderBarChart = (rootId, data, valueKey, unit) => {
      const root = document.getElementById(rootId);
      if (!data.length) {
        root.innerHTML = '<div class="muted">Aucune donnée</div>';
        return;
      }
      const maxValue = Math.max(...data.map(r => r[valueKey]));
      root.innerHTML = data.map(r => `
        <div class="bar">
          <div class="bar-label">${esc(r.nom)}</div>
          <div class="bar-track">
            <div class="bar-fill" style="width:${(r[valueKey] / maxValue) * 100}%"></div>
          </div>
          <div class="muted" style="width:110px; text-align:right;">${formatFloat(r[valueKey])} ${unit}</div>
        </div>
      `).join('');
    };

    renderBarChart(
      'chart',
      records.filter(r => typeof r.aed_etp === 'number').sort((a, b) => b.aed_etp - a.aed_etp).slice(0, topN),
      'aed_etp', 'ETP'
    );
    renderBarChart(
      'chart-ratio',
      records.filter(r => typeof r.ratio === 'number').sort((a, b) => b.ratio - a.ratio).slice(0, topN),
      'ratio', 'élèves/ETP'
    );

    const tbody = document.getElementById('table-body');
    const filterInput = document.getElementById('filter-text');
    const headers = Array.from(document.querySelectorAll('th[data-sort]'));

    let sortKey = 'aed_etp';
    let sortDir = 'desc';

    // Null values sort last whatever the direction.
    const applySort = (rows) => {
      const dir = sortDir === 'asc' ? 1 : -1;
      return rows.slice().sort((a, b) => {
        const av = a[sortKey];
        const bv = b[sortKey];
        if (av === null || av === undefined) return 1;
        if (bv === null || bv === undefined) return -1;
        if (av < bv) return -1 * dir;
        if (av > bv) return 1 * dir;
        return 0;
      });
    };

    const applyFilter = () => {
      const q = (filterInput.value || '').toLowerCase();
      return records.filter(r => {
        if (!q) return true;
        return (r.nom || '').toLowerCase().includes(q) || (r.commune || '').toLowerCase().includes(q);
      });
    };

    const renderTable = () => {
      const rows = applySort(applyFilter());
      tbody.innerHTML = rows.map(r => `
        <tr>
          <td>${esc(r.nom)}</td>
          <td>${esc(r.commune || 'n.d.')}</td>
          <td>${formatFloat(r.aed_etp)}</td>
          <td>${formatFloat(r.prof_etp)}</td>
          <td>${formatNumber(r.eleves)} (${esc(r.effectifs_annee || 'n.d.')})</td>
          <td>${formatNumber(r.ulis)}</td>
          <td>${formatNumber(r.segpa)}</td>
          <td>${formatFloat1(r.ips)}</td>
          <td>${formatFloat(r.ratio)}</td>
        </tr>
      `).join('');
    };

    headers.forEach(h => {
      h.addEventListener('click', () => {
        const key = h.getAttribute('data-sort');
        if (sortKey === key) {
          sortDir = sortDir === 'asc' ? 'desc' : 'asc';
        } else {
          sortKey = key;
          sortDir = key === 'nom' || key === 'commune' ? 'asc' : 'desc';
        }
        renderTable();
      });
    });

    filterInput.addEventListener('input', renderTable);
    renderTable();
"##;

/// Build the complete dashboard document.
pub fn render_dashboard(
    records: &[MergedSchoolRecord],
    summary: &SummaryStats,
    meta: &ReportMeta,
) -> Result<String> {
    let data_json = serde_json::to_string_pretty(&Payload {
        records,
        summary,
        top_n: meta.top_n,
    })
    .context("failed to serialize dashboard data")?;

    let mut sources = format!(
        "{} & {}",
        escape_html(&meta.indicateurs_file),
        escape_html(&meta.effectifs_file)
    );
    if let Some(ips) = &meta.ips_file {
        sources.push_str(" & ");
        sources.push_str(&escape_html(ips));
    }
    let annee_indicateurs = summary.annee_indicateurs.as_deref().unwrap_or("n.d.");

    Ok(format!(
        r##"<!DOCTYPE html>
<html lang="fr">
<head>
  <meta charset="UTF-8" />
  <title>Dashboard Personnels Vie Scolaire – Collèges {departement} (académie de {academie})</title>
  <style>{css}</style>
</head>
<body>
  <div class="container">
    <div class="top-bar">
      <div>
        <h1>Dashboard – Personnels de vie scolaire · Collèges de {departement_label} ({departement})</h1>
        <div class="muted">Académie de {academie} · Indicateurs personnels {annee_indicateurs} · Effectifs élèves (dernière année disponible)</div>
      </div>
      <div class="muted">Sources : {sources}</div>
    </div>

    <div id="cards" class="grid"></div>

    <h2>Top {top_n} collèges publics par ETP (personnels vie scolaire)</h2>
    <div id="chart" class="card bar-chart"></div>

    <h2>Top {top_n} collèges publics par ratio élèves / ETP</h2>
    <div id="chart-ratio" class="card bar-chart"></div>

    <h2>Vue détaillée</h2>
    <div class="card" style="padding:12px; overflow:auto; max-height:650px;">
      <div style="display:flex; gap:8px; align-items:center; margin-bottom:8px;">
        <input id="filter-text" type="search" placeholder="Filtrer par collège ou commune" style="flex:1; padding:8px; border:1px solid var(--border); border-radius:8px;" />
      </div>
      <table>
        <thead>
          <tr>
            <th data-sort="nom" style="cursor:pointer;">Collège</th>
            <th data-sort="commune" style="cursor:pointer;">Commune</th>
            <th data-sort="aed_etp" style="cursor:pointer;">ETP vie scolaire</th>
            <th data-sort="prof_etp" style="cursor:pointer;">ETP enseignants</th>
            <th data-sort="eleves" style="cursor:pointer;">Élèves</th>
            <th data-sort="ulis" style="cursor:pointer;">ULIS</th>
            <th data-sort="segpa" style="cursor:pointer;">SEGPA</th>
            <th data-sort="ips" style="cursor:pointer;">IPS</th>
            <th data-sort="ratio" style="cursor:pointer;">Élèves / ETP</th>
          </tr>
        </thead>
        <tbody id="table-body"></tbody>
      </table>
    </div>
    <div class="footnote">
      Note : seuls les établissements publics sont inclus. Les ETP « personnels de vie scolaire » comprennent principalement les AED (surveillants, assistants pédagogiques, assistants de prévention et de sécurité, etc.) et peuvent inclure les CPE ou d'autres personnels éducatifs selon la déclaration de l'établissement. La comparaison du code département diffère selon les sources (exacte côté indicateurs, complétée à 3 chiffres côté effectifs, à 2 ou 3 chiffres côté IPS).
      <br />Généré le {generated_at}.
    </div>
  </div>

  <script type="application/json" id="data-json">
{data_json}
  </script>

  <script>
{js}
  </script>
</body>
</html>
"##,
        departement = escape_html(&meta.departement),
        departement_label = escape_html(&meta.departement_label),
        academie = escape_html(&meta.academie),
        annee_indicateurs = escape_html(annee_indicateurs),
        sources = sources,
        top_n = meta.top_n,
        generated_at = escape_html(&meta.generated_at),
        css = CSS,
        js = JS,
        data_json = escape_script(&data_json),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(uai: &str, nom: &str) -> MergedSchoolRecord {
        MergedSchoolRecord {
            uai: uai.to_string(),
            nom: nom.to_string(),
            aed_etp: Some(12.5),
            prof_etp: Some(30.0),
            eleves: Some(300),
            secteur: "PU".to_string(),
            effectifs_annee: Some("2023".to_string()),
            commune: Some("NANTES".to_string()),
            ulis: None,
            segpa: None,
            ips: None,
            ips_ecart_type: None,
            ratio: Some(24.0),
        }
    }

    fn summary() -> SummaryStats {
        SummaryStats {
            nb_colleges: 1,
            aed_total: Some(12.5),
            aed_moyen: Some(12.5),
            aed_min: Some(12.5),
            aed_max: Some(12.5),
            prof_total: Some(30.0),
            prof_moyen: Some(30.0),
            prof_min: Some(30.0),
            prof_max: Some(30.0),
            eleves_total: Some(300),
            ulis_total: None,
            segpa_total: None,
            ips_moyen: None,
            ips_min: None,
            ips_max: None,
            annee_indicateurs: Some("2024".to_string()),
            annee_effectifs: Some("2023".to_string()),
            annee_ips: None,
        }
    }

    fn meta() -> ReportMeta {
        ReportMeta {
            departement: "44".to_string(),
            departement_label: "Loire-Atlantique".to_string(),
            academie: "NANTES".to_string(),
            indicateurs_file: "indicateurs.csv".to_string(),
            effectifs_file: "effectifs.csv".to_string(),
            ips_file: None,
            top_n: 15,
            generated_at: "01/09/2025 12:00".to_string(),
        }
    }

    #[test]
    fn renders_a_complete_document_with_embedded_data() {
        let records = vec![record("0440001A", "College Alpha")];
        let html = render_dashboard(&records, &summary(), &meta()).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.trim_end().ends_with("</html>"));
        assert!(html.contains(r#"<script type="application/json" id="data-json">"#));
        assert!(html.contains(r#""aed_total": 12.5"#));
        assert!(html.contains(r#""eleves_total": 300"#));
        assert!(html.contains(r#""ratio": 24.0"#));
        assert!(html.contains(r#""ips_moyen": null"#));
        assert!(html.contains("indicateurs.csv &amp; effectifs.csv"));
        assert!(html.contains("Top 15 collèges publics"));
        assert!(html.contains("Généré le 01/09/2025 12:00"));
    }

    #[test]
    fn ips_source_is_listed_when_supplied() {
        let mut m = meta();
        m.ips_file = Some("ips.csv".to_string());
        let html = render_dashboard(&[], &summary(), &m).unwrap();
        assert!(html.contains("indicateurs.csv &amp; effectifs.csv &amp; ips.csv"));
    }

    #[test]
    fn metadata_is_html_escaped() {
        let mut m = meta();
        m.academie = "<b>NANTES</b>".to_string();
        let html = render_dashboard(&[], &summary(), &m).unwrap();
        assert!(!html.contains("<b>NANTES</b>"));
        assert!(html.contains("&lt;b&gt;NANTES&lt;/b&gt;"));
    }

    #[test]
    fn data_block_cannot_close_the_script_element() {
        let mut r = record("0440001A", "College Alpha");
        r.commune = Some("X</script><script>Y".to_string());
        let html = render_dashboard(&[r], &summary(), &meta()).unwrap();
        assert!(html.contains(r#"X<\/script><script>Y"#));
        assert!(!html.contains("X</script>"));
    }
}
