use colored::Colorize;
use plugin_feed::config::Config;
use plugin_feed::error::Result;
use plugin_feed::parser::Parser;

pub async fn releases(config: &Config, plugin: &str) -> Result<()> {
    let fetcher = super::open_fetcher(config, false)?;

    let spinner = super::spinner(format!("Fetching releases for {}...", plugin));
    let parser = Parser::load(plugin, config, &fetcher).await;
    spinner.finish_and_clear();
    let parser = parser?;

    let profile = parser.profile();
    println!("{} {}", "==>".bold().green(), profile.title.bold());
    if !profile.description.is_empty() {
        println!("{}", profile.description);
    }
    println!("{}: {}", "Source".bold(), profile.link.cyan());
    println!();

    let releases = parser.releases(None);
    if releases.is_empty() {
        println!("{} No releases found", "✗".red());
        return Ok(());
    }

    for release in releases {
        let stability = format!("{:<10}", release.stability.to_string());
        let stability = if release.stability.is_stable() {
            stability.green()
        } else {
            stability.yellow()
        };

        println!(
            "{} {} {}  {}",
            format!("{:<12}", release.version).bold(),
            stability,
            release.created.format("%Y-%m-%d").to_string().dimmed(),
            release.link.dimmed()
        );
    }

    Ok(())
}
