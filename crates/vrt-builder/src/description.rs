//! The serializable mosaic description.
//!
//! The persisted format is a small XML dialect. Per entry, the
//! `<SrcRect .../>` and `<DstRect .../>` elements and their `xOff`/`yOff`/
//! `xSize`/`ySize` attributes are a compatibility surface checked by
//! external consumers and are reproduced byte for byte, including the
//! space before the self-closing `/>`.

use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;
use raster_core::{DataType, GeoTransform, PixelWindow};
use serde::Serialize;

use crate::config::ResamplingMethod;
use crate::error::{Result, VrtBuildError};
use crate::extent::OutputGrid;
use crate::resolver::SourceRef;

/// One (source, band) contribution to the mosaic.
#[derive(Debug, Clone)]
pub struct MosaicEntry {
    /// Reference to the underlying raster.
    pub source: SourceRef,
    /// Band of the source feeding this entry (1-based).
    pub source_band: usize,
    /// Contributing sub-window, in source pixel space.
    pub src_rect: PixelWindow,
    /// Landing window, in output pixel space.
    pub dst_rect: PixelWindow,
}

/// One band of the output mosaic.
#[derive(Debug, Clone)]
pub struct VrtBand {
    /// Sample data type of the band.
    pub data_type: DataType,
    /// Optional no-data value, used to initialize uncovered pixels.
    pub no_data: Option<f64>,
    /// Whether this band is a synthesized coverage alpha band.
    pub alpha: bool,
    /// Contributing entries, in paint order (later over earlier).
    pub sources: Vec<MosaicEntry>,
}

/// The artifact produced by a mosaic build.
///
/// Holds the output grid, the ordered entries per band, and any recorded
/// overview decimation factors. Live entries keep their source rasters
/// alive for the lifetime of the description.
#[derive(Debug, Clone)]
pub struct VrtDescription {
    /// The output grid.
    pub grid: OutputGrid,
    /// Output bands in order; a coverage alpha band, if any, comes last.
    pub bands: Vec<VrtBand>,
    /// Decimation factors of built overviews, empty if none.
    pub overview_factors: Vec<u32>,
    /// Resampling method the overviews were built with.
    pub overview_resampling: ResamplingMethod,
}

/// Flattened per-entry view for tooling and tests.
#[derive(Debug, Clone, Serialize)]
pub struct EntrySummary {
    /// Output band the entry belongs to (1-based).
    pub band: usize,
    /// Source name, if the source is addressable by name.
    pub source: Option<String>,
    /// Source band feeding the entry (1-based).
    pub source_band: usize,
    pub src_rect: PixelWindow,
    pub dst_rect: PixelWindow,
}

impl VrtDescription {
    /// Flatten all entries across bands into a queryable form.
    pub fn entry_summaries(&self) -> Vec<EntrySummary> {
        let mut summaries = Vec::new();
        for (band_index, band) in self.bands.iter().enumerate() {
            for entry in &band.sources {
                summaries.push(EntrySummary {
                    band: band_index + 1,
                    source: entry.source.name().map(str::to_string),
                    source_band: entry.source_band,
                    src_rect: entry.src_rect,
                    dst_rect: entry.dst_rect,
                });
            }
        }
        summaries
    }

    /// Entry summaries as a JSON value, for tooling.
    pub fn summaries_json(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self.entry_summaries())
            .map_err(|e| VrtBuildError::Serialize(e.to_string()))
    }

    /// Render the description as XML.
    ///
    /// Live sources are written under their advisory name, or an empty
    /// `<SourceFilename>` when unnamed; use [`Self::write_to`] for file
    /// destinations, which rejects live sources outright.
    pub fn to_xml(&self) -> String {
        let mut xml = String::new();

        xml.push_str(&format!(
            "<VRTDataset rasterXSize=\"{}\" rasterYSize=\"{}\">\n",
            self.grid.width, self.grid.height
        ));

        let c = self.grid.geotransform.coeffs();
        xml.push_str(&format!(
            "  <GeoTransform>{}, {}, {}, {}, {}, {}</GeoTransform>\n",
            c[0], c[1], c[2], c[3], c[4], c[5]
        ));

        if !self.overview_factors.is_empty() {
            let factors: Vec<String> =
                self.overview_factors.iter().map(u32::to_string).collect();
            xml.push_str(&format!(
                "  <OverviewList resampling=\"{}\">{}</OverviewList>\n",
                self.overview_resampling,
                factors.join(" ")
            ));
        }

        for (band_index, band) in self.bands.iter().enumerate() {
            xml.push_str(&format!(
                "  <VRTRasterBand dataType=\"{}\" band=\"{}\">\n",
                band.data_type,
                band_index + 1
            ));

            if band.alpha {
                xml.push_str("    <ColorInterp>Alpha</ColorInterp>\n");
            }
            if let Some(no_data) = band.no_data {
                xml.push_str(&format!("    <NoDataValue>{no_data}</NoDataValue>\n"));
            }

            for entry in &band.sources {
                let name = entry.source.name().unwrap_or("");
                xml.push_str("    <SimpleSource>\n");
                xml.push_str(&format!(
                    "      <SourceFilename>{}</SourceFilename>\n",
                    quick_xml::escape::escape(name)
                ));
                xml.push_str(&format!(
                    "      <SourceBand>{}</SourceBand>\n",
                    entry.source_band
                ));
                xml.push_str(&rect_xml("SrcRect", &entry.src_rect));
                xml.push_str(&rect_xml("DstRect", &entry.dst_rect));
                xml.push_str("    </SimpleSource>\n");
            }

            xml.push_str("  </VRTRasterBand>\n");
        }

        xml.push_str("</VRTDataset>\n");
        xml
    }

    /// Write the description to a destination path.
    ///
    /// Fails if any entry holds a live source reference. A reference stays
    /// live exactly when its name does not resolve through the opener, so
    /// persisting it would write a `<SourceFilename>` that is dangling on
    /// reopen.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        for band in &self.bands {
            for entry in &band.sources {
                if matches!(entry.source, SourceRef::Live(_)) {
                    let label = entry.source.name().unwrap_or("<unnamed>");
                    return Err(VrtBuildError::Serialize(format!(
                        "in-memory source '{label}' is not reopenable by name \
                         and cannot be persisted"
                    )));
                }
            }
        }

        std::fs::write(path, self.to_xml())?;
        Ok(())
    }

    /// Parse a description from its XML form.
    ///
    /// All parsed entries carry path references; they are resolved through
    /// the opener at read time.
    pub fn from_xml(xml: &str) -> Result<VrtDescription> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut buf = Vec::new();

        let mut width: Option<usize> = None;
        let mut height: Option<usize> = None;
        let mut geotransform: Option<GeoTransform> = None;
        let mut overview_factors = Vec::new();
        let mut overview_resampling = ResamplingMethod::default();

        let mut bands: Vec<VrtBand> = Vec::new();
        let mut current_band: Option<VrtBand> = None;
        let mut current_entry: Option<PendingEntry> = None;
        let mut text_target = TextTarget::None;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.name().as_ref() {
                    b"VRTDataset" => {
                        for attr in e.attributes().flatten() {
                            let value = String::from_utf8_lossy(&attr.value).to_string();
                            match attr.key.as_ref() {
                                b"rasterXSize" => width = Some(parse_number(&value)?),
                                b"rasterYSize" => height = Some(parse_number(&value)?),
                                _ => {}
                            }
                        }
                    }
                    b"GeoTransform" => text_target = TextTarget::GeoTransform,
                    b"OverviewList" => {
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"resampling" {
                                overview_resampling = ResamplingMethod::from_name(
                                    &String::from_utf8_lossy(&attr.value),
                                );
                            }
                        }
                        text_target = TextTarget::OverviewList;
                    }
                    b"VRTRasterBand" => {
                        let mut band = VrtBand {
                            data_type: DataType::Byte,
                            no_data: None,
                            alpha: false,
                            sources: Vec::new(),
                        };
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"dataType" {
                                band.data_type =
                                    DataType::from_name(&String::from_utf8_lossy(&attr.value));
                            }
                        }
                        current_band = Some(band);
                    }
                    b"ColorInterp" => text_target = TextTarget::ColorInterp,
                    b"NoDataValue" => text_target = TextTarget::NoDataValue,
                    b"SimpleSource" => current_entry = Some(PendingEntry::default()),
                    b"SourceFilename" => text_target = TextTarget::SourceFilename,
                    b"SourceBand" => text_target = TextTarget::SourceBand,
                    b"SrcRect" => {
                        if let Some(entry) = current_entry.as_mut() {
                            entry.src_rect = Some(parse_rect(&e)?);
                        }
                    }
                    b"DstRect" => {
                        if let Some(entry) = current_entry.as_mut() {
                            entry.dst_rect = Some(parse_rect(&e)?);
                        }
                    }
                    _ => {}
                },
                Ok(Event::Text(t)) => {
                    let text = t
                        .unescape()
                        .map_err(|e| VrtBuildError::parse(e.to_string()))?;
                    match text_target {
                        TextTarget::GeoTransform => {
                            geotransform = Some(parse_geotransform(&text)?);
                        }
                        TextTarget::OverviewList => {
                            for token in text.split_whitespace() {
                                overview_factors.push(parse_number(token)?);
                            }
                        }
                        TextTarget::ColorInterp => {
                            if let Some(band) = current_band.as_mut() {
                                band.alpha = text.trim() == "Alpha";
                            }
                        }
                        TextTarget::NoDataValue => {
                            if let Some(band) = current_band.as_mut() {
                                band.no_data = Some(parse_number(&text)?);
                            }
                        }
                        TextTarget::SourceFilename => {
                            if let Some(entry) = current_entry.as_mut() {
                                entry.filename = text.to_string();
                            }
                        }
                        TextTarget::SourceBand => {
                            if let Some(entry) = current_entry.as_mut() {
                                entry.source_band = parse_number(&text)?;
                            }
                        }
                        TextTarget::None => {}
                    }
                    text_target = TextTarget::None;
                }
                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"SimpleSource" => {
                        let entry = current_entry
                            .take()
                            .ok_or_else(|| VrtBuildError::parse("unmatched </SimpleSource>"))?;
                        let band = current_band.as_mut().ok_or_else(|| {
                            VrtBuildError::parse("<SimpleSource> outside <VRTRasterBand>")
                        })?;
                        band.sources.push(entry.finish()?);
                    }
                    b"VRTRasterBand" => {
                        let band = current_band
                            .take()
                            .ok_or_else(|| VrtBuildError::parse("unmatched </VRTRasterBand>"))?;
                        bands.push(band);
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => return Err(VrtBuildError::parse(e.to_string())),
            }
            buf.clear();
        }

        let width = width.ok_or_else(|| VrtBuildError::parse("missing rasterXSize"))?;
        let height = height.ok_or_else(|| VrtBuildError::parse("missing rasterYSize"))?;
        let geotransform =
            geotransform.ok_or_else(|| VrtBuildError::parse("missing <GeoTransform>"))?;

        Ok(VrtDescription {
            grid: OutputGrid {
                geotransform,
                width,
                height,
            },
            bands,
            overview_factors,
            overview_resampling,
        })
    }
}

#[derive(Clone, Copy)]
enum TextTarget {
    None,
    GeoTransform,
    OverviewList,
    ColorInterp,
    NoDataValue,
    SourceFilename,
    SourceBand,
}

#[derive(Default)]
struct PendingEntry {
    filename: String,
    source_band: usize,
    src_rect: Option<PixelWindow>,
    dst_rect: Option<PixelWindow>,
}

impl PendingEntry {
    fn finish(self) -> Result<MosaicEntry> {
        if self.filename.is_empty() {
            return Err(VrtBuildError::parse("<SimpleSource> missing SourceFilename"));
        }
        Ok(MosaicEntry {
            source: SourceRef::Path(self.filename),
            source_band: if self.source_band == 0 {
                1
            } else {
                self.source_band
            },
            src_rect: self
                .src_rect
                .ok_or_else(|| VrtBuildError::parse("<SimpleSource> missing <SrcRect>"))?,
            dst_rect: self
                .dst_rect
                .ok_or_else(|| VrtBuildError::parse("<SimpleSource> missing <DstRect>"))?,
        })
    }
}

fn rect_xml(tag: &str, rect: &PixelWindow) -> String {
    format!(
        "      <{} xOff=\"{}\" yOff=\"{}\" xSize=\"{}\" ySize=\"{}\" />\n",
        tag, rect.x_off, rect.y_off, rect.x_size, rect.y_size
    )
}

fn parse_rect(e: &quick_xml::events::BytesStart<'_>) -> Result<PixelWindow> {
    let mut rect = PixelWindow::new(0, 0, 0, 0);
    for attr in e.attributes().flatten() {
        let value = String::from_utf8_lossy(&attr.value).to_string();
        match attr.key.as_ref() {
            b"xOff" => rect.x_off = parse_number(&value)?,
            b"yOff" => rect.y_off = parse_number(&value)?,
            b"xSize" => rect.x_size = parse_number(&value)?,
            b"ySize" => rect.y_size = parse_number(&value)?,
            _ => {}
        }
    }
    if rect.is_empty() {
        return Err(VrtBuildError::parse(format!(
            "rect element has zero area: {rect}"
        )));
    }
    Ok(rect)
}

fn parse_geotransform(text: &str) -> Result<GeoTransform> {
    let values: Vec<f64> = text
        .split(',')
        .map(|v| parse_number(v.trim()))
        .collect::<Result<_>>()?;
    let coeffs: [f64; 6] = values
        .try_into()
        .map_err(|_| VrtBuildError::parse("<GeoTransform> must have 6 coefficients"))?;
    Ok(GeoTransform::from_coeffs(coeffs))
}

fn parse_number<T: std::str::FromStr>(s: &str) -> Result<T> {
    s.trim()
        .parse()
        .map_err(|_| VrtBuildError::parse(format!("invalid number: '{s}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_description() -> VrtDescription {
        VrtDescription {
            grid: OutputGrid {
                geotransform: GeoTransform::new(440600.0, 3751260.0, 30.0, -60.0),
                width: 42,
                height: 20,
            },
            bands: vec![VrtBand {
                data_type: DataType::Byte,
                no_data: None,
                alpha: false,
                sources: vec![MosaicEntry {
                    source: SourceRef::Path("byte.vrt".to_string()),
                    source_band: 1,
                    src_rect: PixelWindow::new(0, 1, 19, 19),
                    dst_rect: PixelWindow::new(4, 0, 38, 19),
                }],
            }],
            overview_factors: Vec::new(),
            overview_resampling: ResamplingMethod::Nearest,
        }
    }

    #[test]
    fn test_rect_attributes_are_exact() {
        let xml = sample_description().to_xml();
        assert!(xml.contains("<SrcRect xOff=\"0\" yOff=\"1\" xSize=\"19\" ySize=\"19\" />"));
        assert!(xml.contains("<DstRect xOff=\"4\" yOff=\"0\" xSize=\"38\" ySize=\"19\" />"));
    }

    #[test]
    fn test_xml_roundtrip() {
        let description = sample_description();
        let parsed = VrtDescription::from_xml(&description.to_xml()).unwrap();

        assert_eq!(parsed.grid, description.grid);
        assert_eq!(parsed.bands.len(), 1);
        assert_eq!(parsed.bands[0].data_type, DataType::Byte);

        let entry = &parsed.bands[0].sources[0];
        assert_eq!(entry.source.name(), Some("byte.vrt"));
        assert_eq!(entry.source_band, 1);
        assert_eq!(entry.src_rect, PixelWindow::new(0, 1, 19, 19));
        assert_eq!(entry.dst_rect, PixelWindow::new(4, 0, 38, 19));
    }

    #[test]
    fn test_overview_list_roundtrip() {
        let mut description = sample_description();
        description.overview_factors = vec![2, 4];
        description.overview_resampling = ResamplingMethod::Average;

        let xml = description.to_xml();
        assert!(xml.contains("<OverviewList resampling=\"average\">2 4</OverviewList>"));

        let parsed = VrtDescription::from_xml(&xml).unwrap();
        assert_eq!(parsed.overview_factors, vec![2, 4]);
        assert_eq!(parsed.overview_resampling, ResamplingMethod::Average);
    }

    #[test]
    fn test_no_data_and_alpha_roundtrip() {
        let mut description = sample_description();
        description.bands[0].no_data = Some(255.0);
        description.bands.push(VrtBand {
            data_type: DataType::Byte,
            no_data: None,
            alpha: true,
            sources: Vec::new(),
        });

        let parsed = VrtDescription::from_xml(&description.to_xml()).unwrap();
        assert_eq!(parsed.bands[0].no_data, Some(255.0));
        assert!(parsed.bands[1].alpha);
        assert!(!parsed.bands[0].alpha);
    }

    #[test]
    fn test_entry_summaries() {
        let summaries = sample_description().entry_summaries();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].band, 1);
        assert_eq!(summaries[0].source.as_deref(), Some("byte.vrt"));
        assert_eq!(summaries[0].src_rect, PixelWindow::new(0, 1, 19, 19));
    }

    #[test]
    fn test_summaries_json() {
        let json = sample_description().summaries_json().unwrap();
        let entries = json.as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["band"], 1);
        assert_eq!(entries[0]["source"], "byte.vrt");
        assert_eq!(entries[0]["src_rect"]["x_size"], 19);
        assert_eq!(entries[0]["dst_rect"]["x_off"], 4);
    }

    #[test]
    fn test_malformed_xml_rejected() {
        assert!(VrtDescription::from_xml("<VRTDataset rasterXSize=\"1\">").is_err());
        assert!(VrtDescription::from_xml("not xml at all").is_err());
    }

    #[test]
    fn test_missing_geotransform_rejected() {
        let xml = "<VRTDataset rasterXSize=\"1\" rasterYSize=\"1\"></VRTDataset>";
        let err = VrtDescription::from_xml(xml).unwrap_err();
        assert!(matches!(err, VrtBuildError::Parse(_)));
    }
}
