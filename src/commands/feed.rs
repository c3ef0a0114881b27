use colored::Colorize;
use plugin_feed::config::Config;
use plugin_feed::error::Result;
use plugin_feed::parser::load_all;
use plugin_feed::render::render;
use std::path::Path;

/// Render a feed per plugin. Returns how many plugins failed.
pub async fn feed(
    config: &Config,
    plugins: &[String],
    output: Option<&Path>,
    no_cache: bool,
) -> Result<usize> {
    let fetcher = super::open_fetcher(config, no_cache)?;

    let spinner = super::spinner(format!("Fetching {} plugin(s)...", plugins.len()));
    let results = load_all(plugins, config, &fetcher).await;
    spinner.finish_and_clear();

    if let Some(dir) = output {
        std::fs::create_dir_all(dir)?;
    }

    let mut failed = 0;
    for (plugin, result) in results {
        let rendered = result.and_then(|parser| {
            let releases = parser.releases(None);
            render(parser.profile(), &releases, config.format).map(|body| (body, releases.len()))
        });

        let (body, count) = match rendered {
            Ok(rendered) => rendered,
            Err(err) => {
                eprintln!("{} {}", "✗".red(), err.to_string().red());
                failed += 1;
                continue;
            }
        };

        match output {
            Some(dir) => {
                let path = dir.join(format!("{}.{}", plugin, config.format.extension()));
                std::fs::write(&path, body)?;
                eprintln!(
                    "{} {} ({} releases) -> {}",
                    "✓".green(),
                    plugin.bold(),
                    count,
                    path.display().to_string().cyan()
                );
            }
            None => print!("{}", body),
        }
    }

    Ok(failed)
}
