//! Generate static files

use anyhow::Result;

use crate::generator::{GenerateReport, Generator};
use crate::Site;

/// Generate the static site from the configured content repository
pub async fn run(site: &Site) -> Result<GenerateReport> {
    let start = std::time::Instant::now();

    let generator = Generator::new(site, site.fetcher()?)?;
    let report = generator.generate().await?;

    tracing::info!(
        "Generated {} posts ({} on the home page, {} assets) in {:.2}s",
        report.posts,
        report.listed,
        report.assets,
        start.elapsed().as_secs_f64()
    );

    Ok(report)
}
