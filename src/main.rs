use anyhow::Result;
use ibd_corpus::{discover_live_sources, write_json_report, CorpusETL, IntegrityMode, NamedSource, RecordKind};
use std::fs;
use std::path::PathBuf;

const ARCHIVE_ROOT: &str = "./data/raw";
const INTERIM_ROOT: &str = "./data/interim";
const PROCESSED_ROOT: &str = "./data/processed";

fn main() -> Result<()> {
    let archive_dir = PathBuf::from(ARCHIVE_ROOT);
    let interim_dir = PathBuf::from(INTERIM_ROOT);
    let processed_dir = PathBuf::from(PROCESSED_ROOT);
    fs::create_dir_all(&interim_dir)?;

    let etl = CorpusETL::new().progress(true);

    let bad = etl.check_archives(&archive_dir, IntegrityMode::Quick { sample_bytes: 4 << 20 })?;
    for (path, err) in &bad {
        eprintln!("corrupt archive {}: {}", path.display(), err);
    }
    if !bad.is_empty() {
        anyhow::bail!("{} archives failed the integrity check", bad.len());
    }

    // 1) archives -> per-community historical CSVs
    let filtered = etl.filter_archives(&archive_dir, &interim_dir)?;

    // 2) comments + posts -> per-community combined CSVs
    let mut sources = Vec::new();
    let mut communities: Vec<&str> = filtered.iter().map(|(job, _, _)| job.community.as_str()).collect();
    communities.sort();
    communities.dedup();
    for community in communities {
        let out_for = |kind: RecordKind| {
            filtered
                .iter()
                .find(|(job, _, _)| job.community == community && job.kind == kind)
                .map(|(_, out, _)| out.clone())
        };
        match (out_for(RecordKind::Comment), out_for(RecordKind::Post)) {
            (Some(comments), Some(posts)) => {
                let combined = interim_dir.join(format!("{community}_combined_data.csv"));
                etl.join_files(&comments, &posts, &combined)?;
                sources.push(NamedSource::new(format!("{community}_historical"), combined));
            }
            (None, Some(posts)) => sources.push(NamedSource::new(format!("{community}_historical"), posts)),
            _ => eprintln!("{community}: comments without submissions, skipped"),
        }
    }

    // 3) + live snapshots -> unified + structured corpus
    sources.extend(discover_live_sources(&interim_dir));
    let (structured, report) = etl.build_master_table(
        &sources,
        &processed_dir.join("IBD_complete_dataset.csv"),
        &processed_dir.join("IBD_structured_corpus.csv"),
    )?;
    write_json_report(&processed_dir.join("IBD_coverage_report.json"), &report)?;

    println!(
        "Corpus: {} documents from {} sources ({} failed)",
        structured.len(),
        report.loaded.len(),
        report.failed.len()
    );
    Ok(())
}
