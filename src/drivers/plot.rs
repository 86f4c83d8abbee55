use std::io::Cursor;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use plotters::prelude::*;
use crate::drivers::error::ScopeError;
use crate::drivers::pipeline::Snapshot;
#[derive(Clone, Debug)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    pub background: RGBColor,
    pub palette: Vec<RGBColor>,
    pub marker_color: RGBColor,
}
impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 900,
            height: 400,
            background: RGBColor(10, 10, 10),
            palette: vec![BLUE, RED, GREEN, CYAN, MAGENTA, YELLOW, WHITE],
            marker_color: RGBColor(255, 80, 80),
        }
    }
}
impl PlotStyle {
    /// Palette colour for the `idx`-th series; an empty palette draws everything white.
    pub fn color(&self, idx: usize) -> RGBColor {
        match self.palette.len() {
            0 => WHITE,
            len => self.palette[idx % len],
        }
    }
}
/// All derived signals on one time axis, with trigger lines and enlarged coincident points.
pub fn render_stacked_png(snapshot: &Snapshot, style: &PlotStyle) -> Result<Vec<u8>, ScopeError> {
    let Some((t_start, t_end)) = snapshot.visible_range() else {
        return Err(ScopeError::Plot("snapshot has no timestamps".into()));
    };
    if snapshot.signals.is_empty() {
        return Err(ScopeError::Plot("snapshot has no channels".into()));
    }
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        let (y_min, y_max) = snapshot
            .signals
            .iter()
            .flat_map(|s| s.values.iter().copied())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
        let y_bounds = if (y_max - y_min).abs() < f64::EPSILON {
            (y_min - 1.0, y_max + 1.0)
        } else {
            (y_min, y_max)
        };
        let x_end = if t_end > t_start { t_end } else { t_start + 1.0 };
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption("EEG", ("sans-serif", 20).into_font().color(&WHITE))
            .set_label_area_size(LabelAreaPosition::Left, 45)
            .set_label_area_size(LabelAreaPosition::Bottom, 40)
            .build_cartesian_2d(t_start..x_end, y_bounds.0..y_bounds.1)?;
        chart
            .configure_mesh()
            .light_line_style(&WHITE.mix(0.1))
            .draw()?;
        for marker in &snapshot.markers {
            let color = style.marker_color;
            chart.draw_series(LineSeries::new(
                vec![(marker.x, y_bounds.0), (marker.x, y_bounds.1)],
                &color,
            ))?;
        }
        for (idx, signal) in snapshot.signals.iter().enumerate() {
            let color = style.color(idx);
            let series = snapshot
                .timestamps
                .iter()
                .copied()
                .zip(signal.values.iter().copied());
            chart
                .draw_series(LineSeries::new(series, &color))?
                .label(signal.channel.clone())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
            let hits = snapshot
                .timestamps
                .iter()
                .zip(&signal.values)
                .zip(&signal.trigger_flags)
                .filter(|(_, flagged)| **flagged)
                .map(|((t, v), _)| Circle::new((*t, *v), 5, style.marker_color.filled()));
            chart.draw_series(hits)?;
        }
        chart
            .configure_series_labels()
            .border_style(&WHITE.mix(0.2))
            .background_style(&style.background)
            .draw()?;
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}
pub fn render_spectrum_png(snapshot: &Snapshot, style: &PlotStyle) -> Result<Vec<u8>, ScopeError> {
    if snapshot.spectra.iter().all(|s| s.is_empty()) {
        return Err(ScopeError::Plot("snapshot has no spectra".into()));
    }
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        let f_max = snapshot
            .spectra
            .iter()
            .filter_map(|s| s.frequencies_hz.last().copied())
            .fold(0.0f64, f64::max)
            .max(1e-3);
        let m_max = snapshot
            .spectra
            .iter()
            .flat_map(|s| s.magnitudes.iter().copied())
            .fold(0.0f64, f64::max)
            .max(1e-3);
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption(
                "Power Spectrum",
                ("sans-serif", 20).into_font().color(&WHITE),
            )
            .set_label_area_size(LabelAreaPosition::Left, 45)
            .set_label_area_size(LabelAreaPosition::Bottom, 40)
            .build_cartesian_2d(0f64..f_max, 0f64..m_max)?;
        chart
            .configure_mesh()
            .x_desc("Frequency (Hz)")
            .light_line_style(&WHITE.mix(0.1))
            .draw()?;
        for (idx, profile) in snapshot.spectra.iter().enumerate() {
            if profile.is_empty() {
                continue;
            }
            let color = style.color(idx);
            let series = profile
                .frequencies_hz
                .iter()
                .copied()
                .zip(profile.magnitudes.iter().copied());
            chart
                .draw_series(LineSeries::new(series, &color))?
                .label(profile.channel.clone())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
        }
        chart
            .configure_series_labels()
            .border_style(&WHITE.mix(0.2))
            .background_style(&style.background)
            .draw()?;
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}
fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>, ScopeError> {
    let image = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, buffer.to_vec())
        .ok_or_else(|| ScopeError::Plot("failed to allocate image buffer".into()))?;
    let mut output = Vec::new();
    let dynamic = DynamicImage::ImageRgb8(image);
    dynamic.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}
