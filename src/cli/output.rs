//! Colored output helpers for the CLI.

use crate::research::pipeline::ResearchRun;
use crate::research::progress::ProgressUpdate;
use owo_colors::OwoColorize;

/// Output style configuration
pub struct Output {
    /// Whether to use colored output
    pub colored: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    /// Create a new output helper with colors enabled
    pub fn new() -> Self {
        Self { colored: true }
    }

    /// Create a new output helper with colors disabled
    pub fn no_color() -> Self {
        Self { colored: false }
    }

    pub fn banner(&self) {
        if self.colored {
            println!(
                "\n   {} {}\n",
                "vidya".bright_cyan().bold(),
                format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
            );
        } else {
            println!("\n   vidya v{}\n", env!("CARGO_PKG_VERSION"));
        }
    }

    /// Print a success message with a checkmark
    pub fn success(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "✓".green().bold(), message.green());
        } else {
            println!("  [OK] {}", message);
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "•".blue(), message);
        } else {
            println!("  [INFO] {}", message);
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "⚠".yellow().bold(), message.yellow());
        } else {
            println!("  [WARN] {}", message);
        }
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "✗".red().bold(), message.red());
        } else {
            eprintln!("  [ERROR] {}", message);
        }
    }

    /// One pipeline progress line. Finished stages get a checkmark.
    pub fn progress(&self, update: &ProgressUpdate) {
        let stage = format!("[{}]", update.stage);
        match (self.colored, update.done) {
            (true, true) => println!(
                "  {} {} {}",
                "✓".green().bold(),
                stage.dimmed(),
                update.message.green()
            ),
            (true, false) => println!(
                "  {} {} {}",
                "…".cyan(),
                stage.dimmed(),
                update.message.bright_white()
            ),
            (false, true) => println!("  [DONE] {} {}", stage, update.message),
            (false, false) => println!("  {} {}", stage, update.message),
        }
    }

    /// Print a header for a section
    pub fn header(&self, title: &str) {
        if self.colored {
            println!("\n  {}", title.bright_white().bold().underline());
        } else {
            println!("\n  === {} ===", title);
        }
    }

    /// Print a key-value pair
    pub fn kv(&self, key: &str, value: &str) {
        if self.colored {
            println!("    {}: {}", key.dimmed(), value.bright_white());
        } else {
            println!("    {}: {}", key, value);
        }
    }

    /// Print a list item
    pub fn list_item(&self, item: &str) {
        if self.colored {
            println!("    {} {}", "•".blue(), item);
        } else {
            println!("    - {}", item);
        }
    }

    /// Summary of a finished run: category, searches, score and the
    /// report's follow-up material.
    pub fn run_summary(&self, run: &ResearchRun) {
        self.header("Research Summary");
        self.kv("Query", &run.query);
        self.kv("Category", run.category.as_str());
        self.kv(
            "Searches",
            &format!("{}/{} succeeded", run.searches.succeeded, run.searches.total),
        );
        self.kv(
            "Score",
            &format!("{:.1}/10 ({})", run.best_score, run.refinement_state),
        );
        self.kv("Citations", &run.report.citation_count.to_string());
        self.kv("Duration", &format!("{:.1}s", run.duration_ms as f64 / 1000.0));
        if let Some(path) = &run.report_path {
            self.kv("Report", &path.display().to_string());
        }

        if !run.searches.failures.is_empty() {
            self.header("Failed Searches");
            for failure in &run.searches.failures {
                self.list_item(&format!("{}: {}", failure.query, failure.reason));
            }
        }

        self.header("Summary");
        println!("    {}", run.report.short_summary);

        if !run.report.follow_up_questions.is_empty() {
            self.header("Follow-up Questions");
            for question in &run.report.follow_up_questions {
                self.list_item(question);
            }
        }
    }

    /// Print newline
    pub fn newline(&self) {
        println!();
    }
}
