//! Plain-text rendering for the command-line runner

use halexp_common::events::RowState;
use std::fmt::Write;

use crate::details::DetailSummary;
use crate::table::TableSnapshot;

/// Render a snapshot as one block per configuration row
pub fn render_table(snapshot: &TableSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "run {} ({} configurations, {} outstanding)",
        snapshot.run_id,
        snapshot.rows.len(),
        snapshot.outstanding
    );

    for row in &snapshot.rows {
        let _ = writeln!(out);
        let _ = writeln!(out, "[{}] {}", row.layout.index, row.layout.display_name);
        if let Some(url) = &row.layout.query_url {
            let _ = writeln!(out, "    query: {}", url);
        }
        match &row.state {
            RowState::Pending => {
                let _ = writeln!(out, "    (pending)");
            }
            RowState::Failed { error } => {
                let _ = writeln!(out, "    ERROR: {}", error);
            }
            RowState::Loaded { items } if items.is_empty() => {
                let _ = writeln!(out, "    (no results)");
            }
            RowState::Loaded { items } => {
                for (rank, item) in items.iter().enumerate() {
                    let _ = writeln!(
                        out,
                        "    #{:<2} {}  <{}>  [{}]",
                        rank + 1,
                        item.label,
                        item.link_url,
                        item.detail_key
                    );
                }
            }
        }
    }
    out
}

/// Render a detail summary as indented lines
pub fn render_summary(key: &str, summary: &DetailSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "details {}", key);
    match summary {
        DetailSummary::Author {
            aggregation_score,
            lab,
            matches,
            match_count,
            papers,
            paper_count,
        } => {
            if let Some(score) = aggregation_score {
                let _ = writeln!(out, "    Score: {:.3}", score);
            }
            if let Some(lab) = lab {
                let _ = writeln!(out, "    Labo: {}", lab);
            }
            let _ = writeln!(out, "    Matches ({}):", match_count);
            for phrase in matches {
                let _ = writeln!(out, "      - {}", phrase);
            }
            let _ = writeln!(out, "    Papers ({}):", paper_count);
            for title in papers {
                let _ = writeln!(out, "      - {}", title);
            }
        }
        DetailSummary::Document {
            citation,
            subtitle,
            abstract_text,
            keywords,
            publication_date,
        } => {
            for (label, value) in [
                ("Citation", citation),
                ("Subtitle", subtitle),
                ("Abstract", abstract_text),
                ("Year", publication_date),
            ] {
                if let Some(value) = value {
                    let _ = writeln!(out, "    {}: {}", label, value);
                }
            }
            if !keywords.is_empty() {
                let _ = writeln!(out, "    Keywords: {}", keywords.join(", "));
            }
        }
    }
    out
}
