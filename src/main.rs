mod db;
mod fetcher;
mod lookup;
mod parser;

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::warn;

#[derive(Parser)]
#[command(name = "njcourts_scraper", about = "NJ courts opinion and calendar extractor")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum DocKind {
    /// Daily case announcement listing (HTML or RSS)
    Opinions,
    /// Weekly oral-argument calendar (plain text)
    Calendar,
}

impl DocKind {
    fn as_str(self) -> &'static str {
        match self {
            DocKind::Opinions => "opinions",
            DocKind::Calendar => "calendar",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema
    Init,
    /// Fetch a document and queue it for processing
    Fetch {
        kind: DocKind,
        /// Fetch from this URL (defaults to the njcourts.gov opinions page)
        #[arg(long)]
        url: Option<String>,
        /// Read from a local file instead of the network
        #[arg(long)]
        file: Option<PathBuf>,
        /// For opinions: poll the RSS feed instead of the listing page
        #[arg(long)]
        rss: bool,
    },
    /// Parse queued documents into cases and hearings
    Process {
        /// Max documents to process (default: all pending)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Load the known-judges roster from a file (one name per line)
    Judges { file: PathBuf },
    /// Show extraction statistics
    Stats,
    /// Hearing judges not found on the loaded roster
    Report,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            println!("Schema ready.");
            Ok(())
        }
        Commands::Fetch { kind, url, file, rss } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let (source, body) = match file {
                Some(path) => {
                    let body = std::fs::read_to_string(&path)?;
                    (path.display().to_string(), body)
                }
                None => {
                    let url = url.unwrap_or_else(|| {
                        if rss {
                            fetcher::OPINIONS_RSS_URL.to_string()
                        } else {
                            fetcher::OPINIONS_URL.to_string()
                        }
                    });
                    let body = fetcher::fetch_text(&url).await?;
                    (url, body)
                }
            };
            let id = db::insert_document(&conn, kind.as_str(), &source, &body)?;
            println!("Queued {} document #{} from {}", kind.as_str(), id, source);
            Ok(())
        }
        Commands::Process { limit } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let docs = db::fetch_unprocessed(&conn, limit)?;
            if docs.is_empty() {
                println!("No pending documents. Run 'fetch' first.");
                return Ok(());
            }
            println!("Processing {} documents...", docs.len());
            let counts = process_documents(&conn, &docs)?;
            counts.print();
            Ok(())
        }
        Commands::Judges { file } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let names: Vec<String> = std::fs::read_to_string(&file)?
                .lines()
                .map(parser::judges::normalize_judge)
                .filter(|n| !n.is_empty())
                .collect();
            let inserted = db::insert_judges(&conn, &names)?;
            println!("Roster: {} new judges ({} in file)", inserted, names.len());
            Ok(())
        }
        Commands::Stats => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Documents: {}", s.documents);
            println!("Pending:   {}", s.pending);
            println!("Failed:    {}", s.failed);
            println!("Cases:     {}", s.cases);
            println!("Calendars: {}", s.calendars);
            println!("Hearings:  {}", s.hearings);
            Ok(())
        }
        Commands::Report => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let roster = parser::judges::JudgeRoster::from_names(db::load_judge_roster(&conn)?);
            if roster.is_empty() {
                println!("No roster loaded. Run 'judges <file>' first.");
                return Ok(());
            }
            let assigned = db::fetch_assigned_judges(&conn)?;
            let seen: Vec<&str> = assigned
                .iter()
                .flat_map(|s| s.split("; "))
                .map(str::trim)
                .collect();
            let unknown = roster.unknown(seen);
            if unknown.is_empty() {
                println!("All hearing judges match the roster ({} names).", roster.len());
            } else {
                println!("{} hearing judges not on the roster:", unknown.len());
                for name in &unknown {
                    println!("  {}", name);
                }
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

struct ProcessCounts {
    cases: usize,
    calendars: usize,
    hearings: usize,
    skipped_titles: usize,
    failed_docs: usize,
}

impl ProcessCounts {
    fn print(&self) {
        println!(
            "Saved {} cases, {} calendars, {} hearings ({} titles skipped, {} documents failed).",
            self.cases, self.calendars, self.hearings, self.skipped_titles, self.failed_docs,
        );
    }
}

enum DocOutcome {
    Cases(Vec<db::CaseRow>, usize),
    Calendar(parser::calendar::CalendarParse),
    Failed(String),
}

fn process_documents(
    conn: &rusqlite::Connection,
    docs: &[db::PendingDocument],
) -> anyhow::Result<ProcessCounts> {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;

    let index = lookup::IndexLookup::load(std::path::Path::new(lookup::INDEX_PATH))?;

    let pb = ProgressBar::new(docs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
            .unwrap()
            .progress_chars("#>-"),
    );

    let mut counts = ProcessCounts {
        cases: 0,
        calendars: 0,
        hearings: 0,
        skipped_titles: 0,
        failed_docs: 0,
    };

    for chunk in docs.chunks(50) {
        let results: Vec<(i64, DocOutcome)> = chunk
            .par_iter()
            .map(|doc| (doc.id, process_one(doc, index.as_ref())))
            .collect();

        for (doc_id, outcome) in results {
            match outcome {
                DocOutcome::Cases(rows, skipped) => {
                    counts.cases += rows.len();
                    counts.skipped_titles += skipped;
                    db::save_cases(conn, doc_id, &rows)?;
                    db::mark_processed(conn, doc_id, None)?;
                }
                DocOutcome::Calendar(parsed) => {
                    counts.calendars += 1;
                    counts.hearings += parsed.hearings.len();
                    db::save_calendar(conn, &parsed)?;
                    db::mark_processed(conn, doc_id, None)?;
                }
                DocOutcome::Failed(err) => {
                    warn!("Document #{} failed: {}", doc_id, err);
                    counts.failed_docs += 1;
                    db::mark_processed(conn, doc_id, Some(&err))?;
                }
            }
        }
        pb.inc(chunk.len() as u64);
    }

    pb.finish_and_clear();
    Ok(counts)
}

fn process_one(doc: &db::PendingDocument, index: Option<&lookup::IndexLookup>) -> DocOutcome {
    match doc.kind.as_str() {
        "calendar" => match parser::process_calendar(&doc.body) {
            Ok(parsed) => DocOutcome::Calendar(parsed),
            Err(e) => DocOutcome::Failed(e.to_string()),
        },
        _ => {
            let announcements = if doc.body.trim_start().starts_with("<?xml")
                || doc.body.contains("<rss")
            {
                match fetcher::parse_rss(&doc.body) {
                    Ok(items) => items,
                    Err(e) => return DocOutcome::Failed(e.to_string()),
                }
            } else {
                let items = fetcher::extract_announcements(&doc.body);
                // A placeholder listing ("no opinions reported") parses to
                // zero announcements and is a valid empty result; only a
                // body with no listing structure at all is a failure.
                if items.is_empty() && !doc.body.to_lowercase().contains("<li") {
                    return DocOutcome::Failed(
                        "not a recognizable opinions listing".to_string(),
                    );
                }
                items
            };
            let mut rows = Vec::new();
            let mut skipped = 0;
            for ann in &announcements {
                let lookup = index.map(|l| l as &dyn parser::titles::SupremeCourtLookup);
                match parser::process_title(&ann.badge, &ann.title, lookup) {
                    Ok(row) => rows.push(row),
                    Err(e) => {
                        warn!("Skipping title {:?}: {}", ann.title, e);
                        skipped += 1;
                    }
                }
            }
            DocOutcome::Cases(rows, skipped)
        }
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(kind: &str, body: &str) -> db::PendingDocument {
        db::PendingDocument {
            id: 1,
            kind: kind.to_string(),
            source: "test".to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn placeholder_listing_is_valid_empty() {
        let out = process_one(&doc("opinions", "<ul><li>No opinions reported today</li></ul>"), None);
        match out {
            DocOutcome::Cases(rows, skipped) => {
                assert!(rows.is_empty());
                assert_eq!(skipped, 0);
            }
            _ => panic!("placeholder page must be a valid empty result"),
        }
    }

    #[test]
    fn empty_rss_feed_is_valid_empty() {
        let out = process_one(
            &doc("opinions", "<?xml version=\"1.0\"?><rss><channel></channel></rss>"),
            None,
        );
        assert!(matches!(out, DocOutcome::Cases(rows, 0) if rows.is_empty()));
    }

    #[test]
    fn non_listing_body_is_failure() {
        let out = process_one(&doc("opinions", "503 Service Unavailable"), None);
        assert!(matches!(out, DocOutcome::Failed(_)));
    }

    #[test]
    fn listing_with_announcements_parses_titles() {
        let html = r#"<li><span class="badge">Unpublished Appellate</span>
                      <a href="/x.pdf">Smith v. Jones (Essex County, L-0517-19)</a></li>"#;
        let out = process_one(&doc("opinions", html), None);
        match out {
            DocOutcome::Cases(rows, 0) => {
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0].lc_docket_ids, vec!["L-0517-19"]);
            }
            _ => panic!("listing with one announcement must yield one case"),
        }
    }
}
