use anyhow::{Result, bail};
use std::collections::BTreeMap;

use super::leaflet::{CircleMarker, Layer, LeafletMap, Polyline, escape_html};
use crate::bwb::keys as bwb_keys;
use crate::domain::{Dataset, FountainType, GeoRecord, mean_center};
use crate::matching::MatchOutcome;
use crate::osm::parser::keys as osm_keys;
use crate::report::ComparisonReport;
use crate::report::summary::UNKNOWN;

pub const TYPE_MAP_FILE: &str = "berlin_trinkbrunnen_map.html";
pub const SIMPLE_MAP_FILE: &str = "bwb_vs_osm_simple.html";
pub const COMPARISON_MAP_FILE: &str = "trinkbrunnen_osm_vs_bwb_comparison.html";

const BWB_COLOR: &str = "red";
const OSM_COLOR: &str = "blue";
const MATCH_COLOR: &str = "green";
const NOT_AVAILABLE: &str = "N/A";

fn center_of(datasets: &[&Dataset]) -> Result<(f64, f64)> {
    match mean_center(datasets.iter().flat_map(|d| d.iter().map(GeoRecord::coords))) {
        Some(center) => Ok(center),
        None => bail!("Cannot build a map without any fountains"),
    }
}

fn row(label: &str, value: &str) -> String {
    format!("<p><b>{}:</b> {}</p>", label, escape_html(value))
}

fn bwb_rows(record: &GeoRecord) -> String {
    [
        row("Type", &record.attr_or(bwb_keys::TYPE, NOT_AVAILABLE)),
        row("Number", &record.attr_or(bwb_keys::NUMBER, NOT_AVAILABLE)),
        row("Street", &record.attr_or(bwb_keys::STREET, NOT_AVAILABLE)),
    ]
    .concat()
}

fn osm_rows(record: &GeoRecord) -> String {
    [
        row("OSM ID", &record.attr_or(osm_keys::OSM_ID, &record.id)),
        row("Name", &record.attr_or(osm_keys::NAME, NOT_AVAILABLE)),
        row("Operator", &record.attr_or(osm_keys::OPERATOR, NOT_AVAILABLE)),
    ]
    .concat()
}

fn popup(heading_color: &str, heading: &str, body: String) -> String {
    format!(
        r#"<div class="popup"><h4 style="color: {};">{}</h4>{}</div>"#,
        heading_color,
        escape_html(heading),
        body
    )
}

/// All BWB fountains coloured by fountain type, with per-type legend counts
pub fn type_map(bwb: &Dataset) -> Result<LeafletMap> {
    let mut map = LeafletMap::new("Trinkbrunnen Berlin", center_of(&[bwb])?);
    let mut layer = Layer::new("Trinkbrunnen");
    let mut type_counts: BTreeMap<String, usize> = BTreeMap::new();

    for record in bwb {
        let typ = record.attr_or(bwb_keys::TYPE, UNKNOWN);
        let color = FountainType::from_typ(&typ).color();
        *type_counts.entry(typ.clone()).or_insert(0) += 1;

        let body = [
            row("Nummer", &record.attr_or(bwb_keys::NUMBER, NOT_AVAILABLE)),
            row("Straße", &record.attr_or(bwb_keys::STREET, NOT_AVAILABLE)),
            row("Einbaujahr", &record.attr_or(bwb_keys::INSTALLED, NOT_AVAILABLE)),
            row("Betriebszustand", &record.attr_or(bwb_keys::STATUS, NOT_AVAILABLE)),
            row("Eigentümer", &record.attr_or(bwb_keys::OWNER, NOT_AVAILABLE)),
            row("Koordinaten", &format!("{:.6}, {:.6}", record.lat, record.lon)),
        ]
        .concat();

        let street = record.attr_or(bwb_keys::STREET, NOT_AVAILABLE);
        layer.markers.push(
            CircleMarker::new(record.lat, record.lon, color)
                .with_tooltip(&format!("{} - {}", typ, street))
                .with_popup(popup(color, &typ, body)),
        );
    }
    map.layers.push(layer);

    let mut legend = format!(
        "<h4>Trinkbrunnen Berlin</h4><p><b>Gesamt: {} Brunnen</b></p>",
        bwb.len()
    );
    for (typ, count) in &type_counts {
        let color = FountainType::from_typ(typ).color();
        legend.push_str(&format!(
            r#"<p><span style="color: {};">&#9679;</span> {}: {}</p>"#,
            color,
            escape_html(typ),
            count
        ));
    }
    legend.push_str("<hr><p>Daten: Berliner Wasserbetriebe</p><p>Quelle: WFS API</p>");
    map.legend_html = legend;

    Ok(map)
}

/// BWB in red and OSM in blue, no matching
pub fn simple_map(bwb: &Dataset, osm: &Dataset) -> Result<LeafletMap> {
    let mut map = LeafletMap::new("Trinkbrunnen BWB vs OSM", center_of(&[osm, bwb])?);

    let mut bwb_layer = Layer::new("BWB Official");
    for record in bwb {
        bwb_layer.markers.push(
            CircleMarker::new(record.lat, record.lon, BWB_COLOR)
                .with_radius(5.0)
                .with_tooltip("BWB Fountain")
                .with_popup("BWB Official".to_string()),
        );
    }

    let mut osm_layer = Layer::new("OSM Community");
    for record in osm {
        osm_layer.markers.push(
            CircleMarker::new(record.lat, record.lon, OSM_COLOR)
                .with_radius(5.0)
                .with_tooltip("OSM Fountain")
                .with_popup("OSM Community".to_string()),
        );
    }

    map.layers.push(bwb_layer);
    map.layers.push(osm_layer);
    map.legend_html = format!(
        concat!(
            "<h4>Trinkbrunnen</h4>",
            r#"<p><span style="color: red;">&#9679;</span> BWB Official: {}</p>"#,
            r#"<p><span style="color: blue;">&#9679;</span> OSM Community: {}</p>"#,
            "<hr><p>Red = Official Data</p><p>Blue = Community Data</p>"
        ),
        bwb.len(),
        osm.len()
    );

    Ok(map)
}

/// Matched pairs (green, at the BWB position), BWB-only (red) and OSM-only
/// (blue). Matches farther apart than `line_threshold_m` get a connector line.
pub fn comparison_map(
    osm: &Dataset,
    bwb: &Dataset,
    outcome: &MatchOutcome,
    report: &ComparisonReport,
    line_threshold_m: f64,
) -> Result<LeafletMap> {
    let mut map = LeafletMap::new("Trinkbrunnen OSM vs BWB", center_of(&[osm, bwb])?);

    let mut bwb_layer = Layer::new(format!("BWB Official ({})", bwb.len()));
    for record in outcome.unmatched_candidate_records(bwb) {
        let body = [
            bwb_rows(record),
            row("Year", &record.attr_or(bwb_keys::INSTALLED, NOT_AVAILABLE)),
            row("Status", &record.attr_or(bwb_keys::STATUS, NOT_AVAILABLE)),
        ]
        .concat();
        let typ = record.attr_text(bwb_keys::TYPE);
        bwb_layer.markers.push(
            CircleMarker::new(record.lat, record.lon, BWB_COLOR)
                .with_radius(8.0)
                .with_tooltip(&format!("BWB Only: {}", typ))
                .with_popup(popup(BWB_COLOR, "BWB Only", body)),
        );
    }

    let mut osm_layer = Layer::new("OSM Data");
    for record in outcome.unmatched_reference_records(osm) {
        let body = [
            osm_rows(record),
            row("Source", &record.attr_or(osm_keys::SOURCE, NOT_AVAILABLE)),
        ]
        .concat();
        let name = record.attr_or(osm_keys::NAME, "Drinking Water");
        osm_layer.markers.push(
            CircleMarker::new(record.lat, record.lon, OSM_COLOR)
                .with_radius(8.0)
                .with_tooltip(&format!("OSM Only: {}", name))
                .with_popup(popup(OSM_COLOR, "OSM Only", body)),
        );
    }

    let mut match_layer = Layer::new("Matches");
    for m in &outcome.matches {
        let (Some(osm_record), Some(bwb_record)) =
            (osm.get(m.reference_index), bwb.get(m.candidate_index))
        else {
            continue;
        };

        let body = format!(
            "{}<hr><h5>BWB Data:</h5>{}<hr><h5>OSM Data:</h5>{}",
            row("Distance", &format!("{:.1}m", m.distance_m)),
            bwb_rows(bwb_record),
            osm_rows(osm_record)
        );
        let typ = bwb_record.attr_text(bwb_keys::TYPE);
        match_layer.markers.push(
            CircleMarker::new(bwb_record.lat, bwb_record.lon, MATCH_COLOR)
                .with_radius(8.0)
                .with_tooltip(&format!("Match: {}", typ))
                .with_popup(popup(MATCH_COLOR, "Matched", body)),
        );

        if m.distance_m > line_threshold_m {
            match_layer.lines.push(Polyline {
                points: vec![bwb_record.coords(), osm_record.coords()],
                color: MATCH_COLOR.to_string(),
            });
        }
    }

    map.layers.push(bwb_layer);
    map.layers.push(osm_layer);
    map.layers.push(match_layer);
    map.legend_html = format!(
        concat!(
            "<h4>Trinkbrunnen Comparison</h4><h5>Statistics:</h5>",
            r#"<p><span style="color: green;">&#9679;</span> Matches: {}</p>"#,
            r#"<p><span style="color: red;">&#9679;</span> BWB Only: {}</p>"#,
            r#"<p><span style="color: blue;">&#9679;</span> OSM Only: {}</p>"#,
            "<hr><p><b>Total BWB:</b> {}</p><p><b>Total OSM:</b> {}</p>",
            r#"<hr><p style="font-size: 12px;">Coverage: {:.1}%</p>"#
        ),
        report.matched,
        report.bwb_missing,
        report.osm_additional,
        report.bwb_total,
        report.osm_total,
        report.coverage()
    );

    Ok(map)
}
