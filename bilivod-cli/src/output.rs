use crate::{cli::OutputFormat, error::Result};
use bilivod_resolver::extractor::platforms::bilibili::{BilibiliQuality, PageInfo};
use bilivod_resolver::media::TrackKind;
use bilivod_resolver::{PlayableSource, StreamRep};
#[cfg(feature = "colored-output")]
use colored::*;
use std::io::Write;
#[cfg(feature = "table-output")]
use tabled::{Table, Tabled, settings::Style};

pub struct OutputManager {
    #[cfg_attr(not(feature = "colored-output"), allow(dead_code))]
    colored: bool,
}

impl OutputManager {
    pub fn new(colored: bool) -> Self {
        Self { colored }
    }

    pub fn format_source(&self, source: &PlayableSource, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Pretty => Ok(self.source_pretty(source)),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(source)? + "\n"),
            OutputFormat::JsonCompact => Ok(serde_json::to_string(source)? + "\n"),
            #[cfg(feature = "table-output")]
            OutputFormat::Table => Ok(self.source_table(source)),
            #[cfg(not(feature = "table-output"))]
            OutputFormat::Table => Ok(self.source_pretty(source)),
        }
    }

    pub fn format_pages(&self, pages: &[PageInfo], format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Pretty => Ok(self.pages_pretty(pages)),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(pages)? + "\n"),
            OutputFormat::JsonCompact => Ok(serde_json::to_string(pages)? + "\n"),
            #[cfg(feature = "table-output")]
            OutputFormat::Table => Ok(Self::pages_table(pages)),
            #[cfg(not(feature = "table-output"))]
            OutputFormat::Table => Ok(self.pages_pretty(pages)),
        }
    }

    fn source_pretty(&self, source: &PlayableSource) -> String {
        let mut output = String::new();

        output.push_str(&self.colorize("Resolved Source:", &Color::Green, true));
        output.push('\n');
        self.push_field(&mut output, "Quality", &quality_label(source.quality), &Color::Cyan);
        self.push_field(
            &mut output,
            "Format",
            &format!("{} ({})", source.format, source.stream_format),
            &Color::Cyan,
        );
        self.push_field(&mut output, "Tier", &source.tier_index.to_string(), &Color::Cyan);
        if let Some(ms) = source.duration_ms {
            self.push_field(
                &mut output,
                "Duration",
                &format!("{:.1}s", ms as f64 / 1000.0),
                &Color::Cyan,
            );
        }

        if let Some(url) = source.single_url() {
            self.push_field(&mut output, "URL", url, &Color::Blue);
        }

        for kind in [TrackKind::Video, TrackKind::Audio] {
            if let Some(rep) = source.track(kind) {
                output.push('\n');
                let title = match kind {
                    TrackKind::Video => "Video Track:",
                    TrackKind::Audio => "Audio Track:",
                };
                output.push_str(&self.colorize(title, &Color::Green, true));
                output.push('\n');
                self.push_rep(&mut output, rep);
            }
        }

        output
    }

    fn push_rep(&self, output: &mut String, rep: &StreamRep) {
        self.push_field(output, "Id", &rep.id.to_string(), &Color::Cyan);
        self.push_field(output, "Codecs", &rep.codecs, &Color::Cyan);
        self.push_field(
            output,
            "Bandwidth",
            &format!("{} kbps", rep.bandwidth / 1000),
            &Color::Cyan,
        );
        if let Some((width, height)) = rep.resolution() {
            self.push_field(output, "Resolution", &format!("{width}x{height}"), &Color::Cyan);
        }
        if let Some(rate) = &rep.frame_rate {
            self.push_field(output, "FPS", rate, &Color::Cyan);
        }
        self.push_field(output, "URL", &rep.url, &Color::Blue);
        self.push_field(output, "Mirrors", &rep.mirrors.len().to_string(), &Color::Cyan);
        self.push_field(output, "Init", &rep.initialization.to_string(), &Color::Cyan);
        self.push_field(output, "Index", &rep.index_range.to_string(), &Color::Cyan);
    }

    fn pages_pretty(&self, pages: &[PageInfo]) -> String {
        let mut output = String::new();
        output.push_str(&self.colorize(&format!("Pages ({}):", pages.len()), &Color::Green, true));
        output.push('\n');

        for page in pages {
            output.push_str(&format!(
                "  {:>3}. {} {} ({}s)\n",
                page.page,
                self.colorize(&page.cid.to_string(), &Color::Yellow, false),
                self.colorize(&page.part, &Color::Cyan, false),
                page.duration
            ));
        }

        output
    }

    #[cfg(feature = "table-output")]
    fn source_table(&self, source: &PlayableSource) -> String {
        #[derive(Tabled)]
        struct TableRow {
            property: &'static str,
            value: String,
        }

        let mut rows = vec![
            TableRow {
                property: "Quality",
                value: quality_label(source.quality),
            },
            TableRow {
                property: "Format",
                value: format!("{} ({})", source.format, source.stream_format),
            },
            TableRow {
                property: "Tier",
                value: source.tier_index.to_string(),
            },
        ];

        if let Some(url) = source.single_url() {
            rows.push(TableRow {
                property: "URL",
                value: url.to_string(),
            });
        }

        for kind in [TrackKind::Video, TrackKind::Audio] {
            if let Some(rep) = source.track(kind) {
                let (codecs, url) = match kind {
                    TrackKind::Video => ("Video Codecs", "Video URL"),
                    TrackKind::Audio => ("Audio Codecs", "Audio URL"),
                };
                rows.push(TableRow {
                    property: codecs,
                    value: rep.codecs.clone(),
                });
                rows.push(TableRow {
                    property: url,
                    value: rep.url.clone(),
                });
            }
        }

        Table::new(rows).with(Style::modern()).to_string() + "\n"
    }

    #[cfg(feature = "table-output")]
    fn pages_table(pages: &[PageInfo]) -> String {
        #[derive(Tabled)]
        struct PageRow<'a> {
            page: u32,
            cid: u64,
            part: &'a str,
            duration: u64,
        }

        let rows = pages.iter().map(|p| PageRow {
            page: p.page,
            cid: p.cid,
            part: &p.part,
            duration: p.duration,
        });

        Table::new(rows).with(Style::modern()).to_string() + "\n"
    }

    fn push_field(&self, output: &mut String, name: &str, value: &str, color: &Color) {
        output.push_str(&format!(
            "  {}: {}\n",
            self.colorize(name, &Color::Yellow, false),
            self.colorize(value, color, false)
        ));
    }

    fn colorize(&self, text: &str, color: &Color, bold: bool) -> String {
        #[cfg(feature = "colored-output")]
        {
            if self.colored {
                let colored_text = match color {
                    Color::Green => text.green(),
                    Color::Yellow => text.yellow(),
                    Color::Blue => text.blue(),
                    Color::Cyan => text.cyan(),
                };
                if bold {
                    colored_text.bold().to_string()
                } else {
                    colored_text.to_string()
                }
            } else {
                text.to_string()
            }
        }

        #[cfg(not(feature = "colored-output"))]
        {
            let _ = (color, bold);
            text.to_string()
        }
    }
}

fn quality_label(quality: u32) -> String {
    match BilibiliQuality::try_from(quality) {
        Ok(known) => format!("{quality} ({known:?})"),
        Err(_) => quality.to_string(),
    }
}

enum Color {
    Green,
    Yellow,
    Blue,
    Cyan,
}

pub fn write_output(content: &str, output_file: Option<&std::path::Path>) -> Result<()> {
    match output_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, content)?;
        }
        None => {
            print!("{content}");
            std::io::stdout().flush()?;
        }
    }
    Ok(())
}
