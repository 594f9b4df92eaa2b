//! Single-page UI for interactive checks.

use axum::{extract::State, response::Html};

use crate::state::SharedState;

/// GET / — form plus inline script calling the check endpoint
pub async fn home(State(state): State<SharedState>) -> Html<String> {
    Html(render_home(
        state.predictor.threshold(),
        state.config.server.max_group_size,
    ))
}

fn render_home(threshold: f64, max_group: usize) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>PolyPharm — Interaction Check</title>
    <style>
        body {{ font-family: system-ui, sans-serif; margin: 2rem auto; max-width: 720px; padding: 0 1rem; color: #1c2733; }}
        h1 {{ font-size: 1.4rem; }}
        .row {{ display: flex; gap: .5rem; margin-bottom: .5rem; }}
        input[type=text] {{ flex: 1; padding: .5rem; border: 1px solid #c5d0da; border-radius: 6px; }}
        button {{ padding: .5rem 1rem; border: 0; border-radius: 6px; background: #2563eb; color: #fff; cursor: pointer; }}
        button.secondary {{ background: #64748b; }}
        .verdict {{ font-size: 1.15rem; font-weight: 700; margin: 1rem 0 .5rem; }}
        .interaction {{ color: #b91c1c; }}
        .no-interaction {{ color: #15803d; }}
        table {{ border-collapse: collapse; width: 100%; margin-top: .5rem; }}
        td, th {{ border: 1px solid #d5dde5; padding: .4rem .6rem; text-align: left; font-size: .9rem; }}
        .muted {{ color: #64748b; font-size: .85rem; }}
    </style>
</head>
<body>
    <h1>Drug combination interaction check</h1>
    <p class="muted">Enter at least two drug names (up to {max_group}). The decision threshold is {threshold}.</p>
    <div id="names">
        <div class="row"><input type="text" placeholder="e.g. aspirin"></div>
        <div class="row"><input type="text" placeholder="e.g. warfarin"></div>
    </div>
    <div class="row">
        <button class="secondary" onclick="addField()">Add drug</button>
        <button onclick="check()">Check interaction</button>
    </div>
    <div id="result"></div>
    <script>
        function addField() {{
            const row = document.createElement('div');
            row.className = 'row';
            row.innerHTML = '<input type="text" placeholder="drug name">';
            document.getElementById('names').appendChild(row);
        }}

        function pct(p) {{ return (p * 100).toFixed(1) + '%'; }}

        async function check() {{
            const names = Array.from(document.querySelectorAll('#names input'))
                .map(function (i) {{ return i.value.trim(); }})
                .filter(function (v) {{ return v.length > 0; }});
            const out = document.getElementById('result');
            out.innerHTML = '<p class="muted">Checking...</p>';
            const res = await fetch('/api/interactions/check', {{
                method: 'POST',
                headers: {{ 'Content-Type': 'application/json' }},
                body: JSON.stringify({{ names: names }})
            }});
            const data = await res.json();
            if (!res.ok) {{
                out.innerHTML = '<p class="verdict interaction">' + data.error + '</p>';
                return;
            }}
            let html = data.prediction.interaction
                ? '<div class="verdict interaction">Interaction likely (p = ' + pct(data.prediction.probability) + ')</div>'
                : '<div class="verdict no-interaction">No interaction predicted (p = ' + pct(data.prediction.probability) + ')</div>';
            if (data.pairwise.length > 1) {{
                html += '<table><tr><th>Pair</th><th>Probability</th><th>Interaction</th></tr>';
                data.pairwise.forEach(function (p) {{
                    html += '<tr><td>' + p.pair.join(' + ') + '</td><td>' + pct(p.probability) + '</td><td>' + (p.interaction ? 'yes' : 'no') + '</td></tr>';
                }});
                html += '</table>';
            }}
            if (data.known_reports.length > 0) {{
                html += '<h3>Known reports</h3><table><tr><th>Report</th><th>Time</th><th>Drugs</th></tr>';
                data.known_reports.forEach(function (r) {{
                    html += '<tr><td>' + r.report_id + '</td><td>' + r.time + '</td><td>' + r.members.join(', ') + '</td></tr>';
                }});
                html += '</table>';
            }} else {{
                html += '<p class="muted">No historical reports contain this exact combination.</p>';
            }}
            out.innerHTML = html;
        }}
    </script>
</body>
</html>"#
    )
}
