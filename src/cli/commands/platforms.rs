//! Platforms command - show effective fallback chains

use crate::cli::args::PlatformsArgs;
use crate::error::{PackstoreError, PackstoreResult};
use crate::platform::PlatformGraph;
use console::style;

/// Execute the platforms command
pub async fn execute(args: PlatformsArgs) -> PackstoreResult<()> {
    let graph = PlatformGraph::resolve(args.platform_graph.as_deref()).await?;

    match args.platform {
        Some(ref platform) => {
            if !graph.platforms().any(|p| p == platform) {
                return Err(PackstoreError::User(format!(
                    "Platform {platform} has no configured fallback chain \
                     (neutral assets would still resolve)"
                )));
            }
            print_chain(&graph, platform);
        }
        None => {
            let platforms: Vec<String> = graph.platforms().map(str::to_string).collect();
            for platform in &platforms {
                print_chain(&graph, platform);
            }

            if !graph.overrides().is_empty() {
                println!();
                println!("{}", style("Package family pins").bold());
                for pin in graph.overrides() {
                    println!(
                        "  {}* {} {}",
                        pin.package_prefix,
                        style("→").dim(),
                        pin.platform
                    );
                }
            }
        }
    }

    Ok(())
}

fn print_chain(graph: &PlatformGraph, platform: &str) {
    let chain = graph.chain(platform);
    let fallback: Vec<&str> = chain.iter().skip(1).map(String::as_str).collect();
    if fallback.is_empty() {
        println!("{}", style(platform).cyan());
    } else {
        println!(
            "{} {} {}",
            style(platform).cyan(),
            style("→").dim(),
            fallback.join(" → ")
        );
    }
}
