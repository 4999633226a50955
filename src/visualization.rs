//! Visualization utilities for TSP tours.
//!
//! Generates SVG plots of the city layout, of a tour, and of the distance
//! and temperature recorded during a run. Nothing in here is used by the
//! optimizer; every function takes read-only snapshots.

use crate::instance::CityMap;
use crate::progress::ProgressRecord;
use crate::solution::Solution;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::process::Command;

/// SVG visualization generator
pub struct Visualizer {
    /// Canvas width
    pub width: f64,
    /// Canvas height
    pub height: f64,
    /// Margin
    pub margin: f64,
    /// City marker radius
    pub node_radius: f64,
}

impl Default for Visualizer {
    fn default() -> Self {
        Visualizer {
            width: 800.0,
            height: 800.0,
            margin: 50.0,
            node_radius: 6.0,
        }
    }
}

impl Visualizer {
    pub fn new() -> Self {
        Self::default()
    }

    fn header(&self, width: f64, height: f64) -> String {
        format!(
            r##"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">
<style>
    .city {{ fill: #3498db; stroke: #2c3e50; stroke-width: 2; }}
    .start {{ fill: #e74c3c; stroke: #c0392b; stroke-width: 2; }}
    .edge {{ stroke: #34495e; stroke-width: 2; fill: none; }}
    .line {{ stroke: #3498db; stroke-width: 2; fill: none; }}
    .temp {{ stroke: #e67e22; stroke-width: 1.5; fill: none; stroke-dasharray: 5,3; }}
    .axis {{ stroke: #2c3e50; stroke-width: 1; }}
    .label {{ font-family: Arial; font-size: 10px; fill: #2c3e50; }}
    .title {{ font-family: Arial; font-size: 14px; fill: #2c3e50; font-weight: bold; }}
</style>
<rect width="100%" height="100%" fill="#ecf0f1"/>
"##,
            width, height, width, height
        )
    }

    /// Map plane coordinates to canvas coordinates (y axis up)
    fn projection(&self, map: &CityMap) -> impl Fn(f64, f64) -> (f64, f64) {
        let (min_x, max_x, min_y, max_y) = if map.is_empty() {
            (0.0, 1.0, 0.0, 1.0)
        } else {
            map.bounds()
        };
        let span = (max_x - min_x).max(max_y - min_y);
        let span = if span > 0.0 { span } else { 1.0 };
        let scale = (self.width.min(self.height) - 2.0 * self.margin) / span;
        let margin = self.margin;
        let height = self.height;

        move |x: f64, y: f64| {
            let tx = margin + (x - min_x) * scale;
            let ty = height - margin - (y - min_y) * scale;
            (tx, ty)
        }
    }

    fn push_cities(&self, svg: &mut String, map: &CityMap, first: Option<usize>) {
        let transform = self.projection(map);
        for (idx, city) in map.cities().iter().enumerate() {
            let (x, y) = transform(city.x, city.y);
            let class = if Some(idx) == first { "start" } else { "city" };

            svg.push_str(&format!(
                r##"<circle cx="{:.2}" cy="{:.2}" r="{}" class="{}"/>
"##,
                x, y, self.node_radius, class
            ));
            svg.push_str(&format!(
                r##"<text x="{:.2}" y="{:.2}" class="label" text-anchor="middle">{}</text>
"##,
                x,
                y - self.node_radius - 3.0,
                idx
            ));
        }
    }

    /// Plot the cities alone
    pub fn generate_layout_svg(&self, map: &CityMap) -> String {
        let mut svg = self.header(self.width, self.height);

        let seed = map
            .seed
            .map(|s| format!(" (seed: {})", s))
            .unwrap_or_default();
        svg.push_str(&format!(
            r##"<text x="{}" y="25" class="title">N={} cities{}</text>
"##,
            self.margin,
            map.len(),
            seed
        ));

        self.push_cities(&mut svg, map, None);
        svg.push_str("</svg>");
        svg
    }

    /// Plot a closed tour
    pub fn generate_tour_svg(&self, map: &CityMap, solution: &Solution, title: &str) -> String {
        let mut svg = self.header(self.width, self.height);

        svg.push_str(&format!(
            r##"<text x="{}" y="25" class="title">{} | Distance: {:.4}</text>
"##,
            self.margin, title, solution.length
        ));

        let transform = self.projection(map);
        if solution.tour.len() > 1 {
            let mut path = String::new();
            for (k, &city) in solution.tour.iter().enumerate() {
                let c = map.city(city);
                let (x, y) = transform(c.x, c.y);
                if k == 0 {
                    path.push_str(&format!("M {:.2} {:.2}", x, y));
                } else {
                    path.push_str(&format!(" L {:.2} {:.2}", x, y));
                }
            }
            path.push_str(" Z");
            svg.push_str(&format!(
                r##"<path d="{}" class="edge"/>
"##,
                path
            ));
        }

        self.push_cities(&mut svg, map, solution.tour.first().copied());
        svg.push_str("</svg>");
        svg
    }

    /// Plot distance (solid) and temperature (dashed, log scale) against
    /// iteration
    pub fn generate_cost_curve_svg(&self, history: &[ProgressRecord]) -> String {
        let width = self.width;
        let height = 400.0;
        let margin = 50.0;
        let mut svg = self.header(width, height);

        svg.push_str(&format!(
            r#"<text x="{}" y="25" class="title">Distance and temperature per iteration</text>
"#,
            margin
        ));

        let plot_width = width - 2.0 * margin;
        let plot_height = height - 2.0 * margin;
        svg.push_str(&format!(
            r##"<line x1="{}" y1="{}" x2="{}" y2="{}" class="axis"/>
<line x1="{}" y1="{}" x2="{}" y2="{}" class="axis"/>
"##,
            margin,
            height - margin,
            width - margin,
            height - margin,
            margin,
            margin,
            margin,
            height - margin
        ));

        if history.is_empty() {
            svg.push_str("</svg>");
            return svg;
        }

        let max_iter = history.iter().map(|r| r.iteration).max().unwrap_or(1).max(1) as f64;
        let max_len = history.iter().map(|r| r.length).fold(0.0, f64::max).max(1e-12);
        let log_temps: Vec<f64> = history
            .iter()
            .map(|r| r.temperature.max(f64::MIN_POSITIVE).log10())
            .collect();
        let t_hi = log_temps.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let t_lo = log_temps.iter().cloned().fold(f64::INFINITY, f64::min);
        let t_span = (t_hi - t_lo).max(1e-12);

        let x_of = |it: usize| margin + it as f64 / max_iter * plot_width;

        let mut length_path = String::new();
        let mut temp_path = String::new();
        for (k, record) in history.iter().enumerate() {
            let x = x_of(record.iteration);
            let y_len = height - margin - record.length / max_len * plot_height;
            let y_temp = height - margin - (log_temps[k] - t_lo) / t_span * plot_height;
            let cmd = if k == 0 { "M" } else { " L" };
            length_path.push_str(&format!("{} {:.2} {:.2}", cmd, x, y_len));
            temp_path.push_str(&format!("{} {:.2} {:.2}", cmd, x, y_temp));
        }

        svg.push_str(&format!(
            r##"<path d="{}" class="line"/>
<path d="{}" class="temp"/>
<text x="{}" y="{}" class="label">{:.4}</text>
<text x="{}" y="{}" class="label">{}</text>
"##,
            length_path,
            temp_path,
            5.0,
            margin + 4.0,
            max_len,
            width - margin - 30.0,
            height - margin + 15.0,
            max_iter as usize
        ));

        svg.push_str("</svg>");
        svg
    }

    /// Save SVG to file
    pub fn save_svg<P: AsRef<Path>>(&self, svg: &str, path: P) -> std::io::Result<()> {
        let mut file = File::create(path)?;
        file.write_all(svg.as_bytes())?;
        Ok(())
    }

    /// Save SVG as PNG using an external converter if available.
    /// Tries `rsvg-convert`, then `magick convert`, then `inkscape`.
    pub fn save_png<P: AsRef<Path>>(&self, svg: &str, path: P) -> std::io::Result<()> {
        let path = path.as_ref();
        let tmp_svg = path.with_extension("svg.tmp");
        self.save_svg(svg, &tmp_svg)?;

        let out = path.to_string_lossy().to_string();
        let tmp = tmp_svg.to_string_lossy().to_string();
        let attempts: [(&str, Vec<&str>); 3] = [
            ("rsvg-convert", vec!["-o", out.as_str(), tmp.as_str()]),
            ("magick", vec!["convert", tmp.as_str(), out.as_str()]),
            (
                "inkscape",
                vec![tmp.as_str(), "--export-type=png", "--export-filename", out.as_str()],
            ),
        ];

        for (program, args) in attempts.iter() {
            match Command::new(program).args(args).status() {
                Ok(status) if status.success() => {
                    let _ = std::fs::remove_file(&tmp_svg);
                    return Ok(());
                }
                Ok(status) => log::debug!("{} exited with {}", program, status),
                Err(e) => log::debug!("{} unavailable: {}", program, e),
            }
        }

        let _ = std::fs::remove_file(&tmp_svg);
        Err(std::io::Error::new(
            std::io::ErrorKind::Other,
            "No SVG->PNG converter succeeded (tried rsvg-convert, magick, inkscape)",
        ))
    }

    /// Export data for external plotting (e.g., matplotlib)
    pub fn export_plot_data(&self, map: &CityMap, solution: &Solution) -> String {
        let mut data = String::new();

        data.push_str("# TSP Solution Data\n");
        data.push_str(&format!("# Map: {}\n", map.name));
        data.push_str(&format!("# Distance: {:.6}\n\n", solution.length));

        data.push_str("# Cities: id, x, y\n");
        for (idx, city) in map.cities().iter().enumerate() {
            data.push_str(&format!("{},{},{}\n", idx, city.x, city.y));
        }

        data.push_str("\n# Tour: sequence of city ids\n");
        let tour_str: Vec<String> = solution.tour.iter().map(|n| n.to_string()).collect();
        data.push_str(&tour_str.join(","));
        data.push('\n');

        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::City;

    fn square() -> CityMap {
        CityMap::from_cities(
            "test",
            vec![
                City::new(0.0, 0.0),
                City::new(1.0, 0.0),
                City::new(1.0, 1.0),
                City::new(0.0, 1.0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_tour_svg() {
        let map = square();
        let solution = Solution::from_tour(&map, vec![0, 1, 2, 3], "test");

        let viz = Visualizer::new();
        let svg = viz.generate_tour_svg(&map, &solution, "Optimized path");

        assert!(svg.starts_with("<?xml"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("Distance: 4.0000"));
        assert_eq!(svg.matches("<circle").count(), 4);
        assert!(svg.contains(" Z\""));
    }

    #[test]
    fn test_layout_svg_mentions_seed() {
        let map = CityMap::random(6, 3141);
        let svg = Visualizer::new().generate_layout_svg(&map);
        assert!(svg.contains("N=6 cities (seed: 3141)"));
    }

    #[test]
    fn test_cost_curve_svg() {
        let history: Vec<ProgressRecord> = (1..=5)
            .map(|k| ProgressRecord {
                iteration: k * 100,
                length: 10.0 / k as f64,
                temperature: 10.0 * (-(k as f64)).exp(),
                t_min: 1e-3,
            })
            .collect();

        let svg = Visualizer::new().generate_cost_curve_svg(&history);
        assert_eq!(svg.matches("<path").count(), 2);

        let empty = Visualizer::new().generate_cost_curve_svg(&[]);
        assert!(!empty.contains("<path"));
    }

    #[test]
    fn test_export_plot_data() {
        let map = square();
        let solution = Solution::from_tour(&map, vec![3, 2, 1, 0], "test");
        let data = Visualizer::new().export_plot_data(&map, &solution);
        assert!(data.contains("3,2,1,0\n"));
        assert!(data.contains("1,1,0\n"));
    }
}
