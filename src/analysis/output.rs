//! Rendering of ranked results as TSV or HTML.

use std::io::Write;

use crate::common::OutputFormat;

use super::AnalysisResults;

/// Writes the results in the requested format.
pub fn write_results<W: Write>(
    results: &AnalysisResults,
    format: OutputFormat,
    writer: W,
) -> Result<(), anyhow::Error> {
    match format {
        OutputFormat::Tsv => write_tsv(results, writer),
        OutputFormat::Html => write_html(results, writer),
    }
}

/// Writes the ranking as a TSV table with leading `## key=value` metadata
/// lines.
pub fn write_tsv<W: Write>(results: &AnalysisResults, mut writer: W) -> Result<(), anyhow::Error> {
    for (key, value) in &results.metadata {
        writeln!(writer, "## {}={}", key, value)?;
    }
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(writer);
    wtr.write_record([
        "rank",
        "disease_id",
        "disease_name",
        "pretest_probability",
        "posterior_probability",
        "composite_log_ratio",
        "gene_id",
        "gene_symbol",
        "genotype_category",
        "genotype_log_ratio",
        "phenotype_details",
    ])?;
    for (rank, score) in results.ranking.iter().enumerate() {
        let (gene_id, gene_symbol, category, genotype_log_ratio) = match &score.genotype {
            Some(g) => (
                g.gene.to_string(),
                g.gene_symbol.clone(),
                g.category.to_string(),
                format!("{:.4}", g.log_ratio),
            ),
            None => (
                ".".to_string(),
                ".".to_string(),
                ".".to_string(),
                ".".to_string(),
            ),
        };
        let phenotype_details = score
            .phenotype
            .iter()
            .map(|c| format!("{}:{:.4}:{}", c.term, c.log_ratio, c.match_type))
            .collect::<Vec<_>>()
            .join(";");
        wtr.write_record([
            (rank + 1).to_string(),
            score.disease_id.to_string(),
            score.disease_name.clone(),
            format!("{:.6}", score.pretest_probability),
            format!("{:.6}", score.posterior_probability),
            format!("{:.4}", score.composite_log_ratio),
            gene_id,
            gene_symbol,
            category,
            genotype_log_ratio,
            phenotype_details,
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes the ranking as a minimal self-contained HTML page.
pub fn write_html<W: Write>(results: &AnalysisResults, mut writer: W) -> Result<(), anyhow::Error> {
    writeln!(
        writer,
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\"/>\n\
         <title>Disease prioritization</title>\n\
         <style>\n\
         body {{ font-family: sans-serif; margin: 2em; }}\n\
         table {{ border-collapse: collapse; }}\n\
         th, td {{ border: 1px solid #999; padding: 0.3em 0.6em; text-align: left; }}\n\
         </style>\n</head>\n<body>"
    )?;

    writeln!(writer, "<h1>Disease prioritization</h1>")?;
    writeln!(writer, "<h2>Case</h2>\n<table>")?;
    for (key, value) in &results.metadata {
        writeln!(
            writer,
            "<tr><th>{}</th><td>{}</td></tr>",
            escape(key),
            escape(value)
        )?;
    }
    writeln!(writer, "</table>")?;

    writeln!(writer, "<h2>Ranking</h2>\n<table>")?;
    writeln!(
        writer,
        "<tr><th>#</th><th>Disease</th><th>Name</th><th>Posterior</th>\
         <th>log LR</th><th>Gene</th><th>Genotype</th></tr>"
    )?;
    for (rank, score) in results.ranking.iter().enumerate() {
        let (gene, category) = match &score.genotype {
            Some(g) => (g.gene_symbol.clone(), g.category.to_string()),
            None => (String::from("&mdash;"), String::new()),
        };
        writeln!(
            writer,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{:.6}</td>\
             <td>{:.4}</td><td>{}</td><td>{}</td></tr>",
            rank + 1,
            escape(&score.disease_id.to_string()),
            escape(&score.disease_name),
            score.posterior_probability,
            score.composite_log_ratio,
            gene,
            category,
        )?;
    }
    writeln!(writer, "</table>\n</body>\n</html>")?;
    Ok(())
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
