use std::time::Duration;

use catalog::{HttpCatalog, HttpThumbnailProbe};
use clap::{Args as ClapArgs, Parser, Subcommand};
use foundation::{BBox, LngLat};
use scene::HeadlessMap;
use search::SearchApply;
use session::{MapSession, OverlayState, Presentation, SessionConfig, DEFAULT_STAC_API_URL};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless STAC catalog browser")]
struct Args {
    /// Base STAC API URL
    #[arg(long, env = "STAC_API_URL", default_value = DEFAULT_STAC_API_URL)]
    stac_url: String,

    /// Canvas size used for framing and overlay placement: WIDTHxHEIGHT
    #[arg(long, default_value = "1280x800")]
    canvas: String,

    /// HTTP timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout_s: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(ClapArgs, Debug)]
struct SearchArgs {
    /// Collection id; defaults to STAC_COLLECTION
    #[arg(long)]
    collection: Option<String>,

    /// Bounding box: minLon,minLat,maxLon,maxLat
    #[arg(long)]
    bbox: Option<String>,

    /// Items per page (1..=10000); defaults to STAC_ITEM_LIMIT or 10
    #[arg(long)]
    limit: Option<u32>,

    /// Interval start: RFC 3339, YYYY-MM-DDTHH:MM or YYYY-MM-DD
    #[arg(long)]
    start: Option<String>,

    /// Interval end
    #[arg(long)]
    end: Option<String>,

    /// Pages to fetch, following `next` links
    #[arg(long, default_value_t = 1)]
    pages: u32,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search a collection and list the results
    Search(SearchArgs),

    /// Search, then preview one result's thumbnail
    Preview {
        #[command(flatten)]
        search: SearchArgs,

        /// 0-based index of the item to preview
        #[arg(long, default_value_t = 0)]
        item: usize,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let (width, height) = parse_canvas(&args.canvas)?;
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(args.timeout_s))
        .build()?;

    let config = SessionConfig::from_env().with_stac_api_url(args.stac_url.clone());
    let map = HeadlessMap::new(width, height, config.default_viewport);
    let mut session = MapSession::new(config, map)?;
    let catalog = HttpCatalog::new(http.clone());

    match args.command {
        Command::Search(search) => {
            run_search(&mut session, &catalog, &search).await?;
            print_results(&session);
        }
        Command::Preview { search, item } => {
            run_search(&mut session, &catalog, &search).await?;
            print_results(&session);

            let Some(id) = session
                .result()
                .and_then(|r| r.items.get(item))
                .map(|i| i.id.clone())
            else {
                return Err(format!("no item at index {item}").into());
            };
            let probe = HttpThumbnailProbe::new(http);
            session.preview_item_verified(&id, &probe).await;
            session.pump();
            print_overlay(session.overlay());
        }
    }

    let v = session.viewport();
    println!(
        "viewport: lon={:.5} lat={:.5} zoom={:.2}",
        v.longitude, v.latitude, v.zoom
    );
    Ok(())
}

async fn run_search(
    session: &mut MapSession<HeadlessMap>,
    catalog: &HttpCatalog,
    args: &SearchArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(collection) = &args.collection {
        session.select_collection(Some(collection.as_str()));
    }
    if let Some(limit) = args.limit {
        session.set_item_limit(limit);
    }
    session.set_datetime_filter(args.start.as_deref(), args.end.as_deref())?;

    if let Some(bbox) = &args.bbox {
        let bbox = BBox::from_slice(&parse_bbox(bbox)?)?;
        // Drive the same gesture a user would: press at one corner, release at the other.
        session.toggle_bbox_drawing();
        session.pointer_down(LngLat::new(bbox.min_lon(), bbox.max_lat()));
        session.pointer_move(LngLat::new(bbox.max_lon(), bbox.min_lat()));
        session.pointer_up(LngLat::new(bbox.max_lon(), bbox.min_lat()));
    }

    match session.run_search(catalog).await {
        SearchApply::Applied(summary) => info!(items = summary.item_count, "search complete"),
        SearchApply::Failed(e) => return Err(e.into()),
        other => warn!("search not applied: {other:?}"),
    }

    for page in 1..args.pages {
        match session.load_next(catalog).await {
            SearchApply::Applied(summary) => {
                info!(page = page + 1, appended = summary.appended, "page merged")
            }
            SearchApply::NoOp => break,
            SearchApply::Failed(e) => {
                warn!("stopping pagination: {e}");
                break;
            }
            SearchApply::Stale { .. } => break,
        }
    }

    session.pump();
    Ok(())
}

fn print_results(session: &MapSession<HeadlessMap>) {
    let Some(result) = session.result() else {
        println!("no results");
        return;
    };
    let matched = result
        .number_matched
        .map_or_else(|| "?".to_string(), |n| n.to_string());
    println!(
        "{} items (returned {}, matched {}){}",
        result.items.len(),
        result.number_returned,
        matched,
        if result.next.is_some() { ", more available" } else { "" }
    );
    for (i, item) in result.items.iter().enumerate() {
        let thumb = item
            .thumbnail
            .as_ref()
            .and_then(|t| t.url.as_deref())
            .unwrap_or("-");
        println!(
            "{i:>4}  {}  {}  {}  {thumb}",
            item.id,
            item.datetime.as_deref().unwrap_or("-"),
            item.title
        );
    }
}

fn print_overlay(state: &OverlayState) {
    match state {
        OverlayState::None => println!("overlay: none"),
        OverlayState::Details(item) => println!("overlay: details of {}", item.id),
        OverlayState::Thumbnail(t) => {
            println!("overlay: thumbnail panel for {} [{}]", t.item_id, presentation(t.presentation))
        }
        OverlayState::MapAnchoredThumbnail { overlay, rect, .. } => {
            let at = rect.map_or_else(
                || "off-screen".to_string(),
                |r| format!("{:.0},{:.0} {:.0}x{:.0}px", r.x, r.y, r.width, r.height),
            );
            println!(
                "overlay: anchored thumbnail for {} at {at} [{}]",
                overlay.item_id,
                presentation(overlay.presentation)
            );
        }
    }
}

fn presentation(p: Presentation) -> String {
    match p {
        Presentation::Verifying => "verifying".to_string(),
        Presentation::Verified => "image".to_string(),
        Presentation::Degraded(d) => format!("degraded: {d:?}"),
    }
}

fn parse_bbox(bbox: &str) -> Result<[f64; 4], Box<dyn std::error::Error>> {
    let parts: Vec<_> = bbox.split(',').collect();
    if parts.len() != 4 {
        return Err("bbox must be minLon,minLat,maxLon,maxLat".into());
    }
    let min_lon: f64 = parts[0].trim().parse()?;
    let min_lat: f64 = parts[1].trim().parse()?;
    let max_lon: f64 = parts[2].trim().parse()?;
    let max_lat: f64 = parts[3].trim().parse()?;
    Ok([min_lon, min_lat, max_lon, max_lat])
}

fn parse_canvas(canvas: &str) -> Result<(f64, f64), Box<dyn std::error::Error>> {
    let (w, h) = canvas
        .split_once(['x', 'X'])
        .ok_or("canvas must be WIDTHxHEIGHT")?;
    Ok((w.trim().parse()?, h.trim().parse()?))
}

#[cfg(test)]
mod tests {
    use super::{parse_bbox, parse_canvas};

    #[test]
    fn parses_bbox_and_canvas() {
        assert_eq!(parse_bbox("1, 2,3,4.5").unwrap(), [1.0, 2.0, 3.0, 4.5]);
        assert!(parse_bbox("1,2,3").is_err());
        assert_eq!(parse_canvas("800x600").unwrap(), (800.0, 600.0));
        assert!(parse_canvas("800").is_err());
    }
}
