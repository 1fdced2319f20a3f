use colored::Colorize;

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("{}: {}", key.dimmed(), value);
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.yellow().bold());
}

/// Print one line of the reconciliation narrative.
///
/// Holdup and failure lines are highlighted; diffs are colored per line.
pub fn narrate(line: &str) {
    if line.starts_with("FAILURE: ") {
        println!("{}", line.red());
    } else if line.starts_with("HOLDUP: ") {
        println!("{}", line.yellow());
    } else if line.starts_with("--- ") {
        for diff_line in line.lines() {
            println!("{}", diff_line_colored(diff_line));
        }
    } else {
        println!("{line}");
    }
}

fn diff_line_colored(line: &str) -> colored::ColoredString {
    if line.starts_with("+++") || line.starts_with("---") {
        line.bold()
    } else if line.starts_with('+') {
        line.green()
    } else if line.starts_with('-') {
        line.red()
    } else if line.starts_with("@@") {
        line.cyan()
    } else {
        line.normal()
    }
}

/// Print a list of blocking findings
pub fn findings(items: &[String]) {
    for item in items {
        println!("  {}", item.red());
    }
}
