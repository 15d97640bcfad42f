// Writing the figures to image files.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use choropleth::figure::Figure;

use crate::maps::*;

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ImageFormat {
    Svg,
    Png,
    /// Any other format, obtained by converting the PNG image.
    Converted(String),
}

impl ImageFormat {
    pub fn from_path(path: &Path) -> MapResult<ImageFormat> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .filter(|e| !e.is_empty())
            .context(UnsupportedFormatSnafu {
                path: path.display().to_string(),
            })?;
        Ok(match ext.as_str() {
            "svg" => ImageFormat::Svg,
            "png" => ImageFormat::Png,
            _ => ImageFormat::Converted(ext),
        })
    }
}

/// An external program. The arguments may contain the placeholders
/// `{input}`, `{output}`, `{width}` and `{height}`.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ExternalTool {
    pub program: String,
    pub args: Vec<String>,
}

impl ExternalTool {
    /// Renders SVG to PNG with librsvg.
    pub fn default_renderer() -> ExternalTool {
        ExternalTool {
            program: "rsvg-convert".to_string(),
            args: vec![
                "--width".to_string(),
                "{width}".to_string(),
                "--height".to_string(),
                "{height}".to_string(),
                "--output".to_string(),
                "{output}".to_string(),
                "{input}".to_string(),
            ],
        }
    }

    /// Converts PNG to other formats with ImageMagick.
    pub fn default_converter() -> ExternalTool {
        ExternalTool {
            program: "magick".to_string(),
            args: vec!["{input}".to_string(), "{output}".to_string()],
        }
    }

    fn command_args(&self, input: &Path, output: &Path, width: f64, height: f64) -> Vec<String> {
        let width = format!("{}", width.round() as u64);
        let height = format!("{}", height.round() as u64);
        let input = input.display().to_string();
        let output = output.display().to_string();
        self.args
            .iter()
            .map(|a| {
                a.replace("{input}", &input)
                    .replace("{output}", &output)
                    .replace("{width}", &width)
                    .replace("{height}", &height)
            })
            .collect()
    }

    fn run(&self, input: &Path, output: &Path, width: f64, height: f64) -> MapResult<()> {
        let args = self.command_args(input, output, width, height);
        debug!("run: {} {:?}", self.program, args);
        // A file left by a previous run would hide a tool that writes nothing.
        if output.exists() {
            fs::remove_file(output).context(WritingImageSnafu {
                path: output.display().to_string(),
            })?;
        }
        let program = self.program.clone();
        let res = Command::new(&self.program)
            .args(&args)
            .output()
            .context(ToolUnavailableSnafu {
                program: program.clone(),
            })?;
        if !res.status.success() {
            return ToolFailedSnafu {
                program,
                status: res.status.to_string(),
                stderr: String::from_utf8_lossy(&res.stderr).trim().to_string(),
            }
            .fail();
        }
        if !output.exists() {
            return ToolNoOutputSnafu {
                program,
                path: output.display().to_string(),
            }
            .fail();
        }
        Ok(())
    }
}

fn write_svg(figure: &Figure, path: &Path) -> MapResult<()> {
    fs::write(path, figure.to_svg()).context(WritingImageSnafu {
        path: path.display().to_string(),
    })
}

/// Writes the figure in the format given by the extension of `out`.
///
/// Raster images go through an SVG file with the same name, which is kept
/// next to the image.
pub fn export_figure(
    figure: &Figure,
    out: &Path,
    renderer: &ExternalTool,
    converter: &ExternalTool,
) -> MapResult<PathBuf> {
    let format = ImageFormat::from_path(out)?;
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).context(WritingImageSnafu {
            path: parent.display().to_string(),
        })?;
    }
    match &format {
        ImageFormat::Svg => write_svg(figure, out)?,
        ImageFormat::Png => {
            let svg = out.with_extension("svg");
            write_svg(figure, &svg)?;
            renderer.run(&svg, out, figure.width, figure.height)?;
        }
        ImageFormat::Converted(_) => {
            let svg = out.with_extension("svg");
            let png = out.with_extension("png");
            write_svg(figure, &svg)?;
            renderer.run(&svg, &png, figure.width, figure.height)?;
            converter.run(&png, out, figure.width, figure.height)?;
        }
    }
    info!("Wrote {:?} image {}", format, out.display());
    Ok(out.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn figure() -> Figure {
        let mut fig = Figure::new(640.0, 480.5);
        fig.add_rect(0.0, 0.0, 10.0, 10.0, choropleth::COLOR_OTHER);
        fig
    }

    fn tool(program: &str, args: &[&str]) -> ExternalTool {
        ExternalTool {
            program: program.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn formats() {
        assert_eq!(
            ImageFormat::from_path(Path::new("a/map.SVG")).unwrap(),
            ImageFormat::Svg
        );
        assert_eq!(
            ImageFormat::from_path(Path::new("map.png")).unwrap(),
            ImageFormat::Png
        );
        assert_eq!(
            ImageFormat::from_path(Path::new("map.jpg")).unwrap(),
            ImageFormat::Converted("jpg".to_string())
        );
        let err = ImageFormat::from_path(Path::new("map")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Export);
    }

    #[test]
    fn placeholders() {
        let args = ExternalTool::default_renderer().command_args(
            Path::new("in.svg"),
            Path::new("out.png"),
            1300.0,
            599.6,
        );
        assert_eq!(
            args,
            vec![
                "--width", "1300", "--height", "600", "--output", "out.png", "in.svg"
            ]
        );
    }

    #[test]
    fn svg_in_new_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("maps").join("va.svg");
        let unused = tool("/nonexistent/tool", &[]);
        let res = export_figure(&figure(), &out, &unused, &unused).unwrap();
        assert_eq!(res, out);
        let svg = fs::read_to_string(out).unwrap();
        assert!(svg.contains("width=\"640\""));
        assert!(svg.contains("height=\"480.5\""));
    }

    #[cfg(unix)]
    #[test]
    fn raster_through_tools() {
        let dir = tempfile::tempdir().unwrap();
        let copy = tool("cp", &["{input}", "{output}"]);
        let out = dir.path().join("va.png");
        export_figure(&figure(), &out, &copy, &copy).unwrap();
        assert!(out.exists());
        assert!(dir.path().join("va.svg").exists());

        let out = dir.path().join("va.jpg");
        export_figure(&figure(), &out, &copy, &copy).unwrap();
        assert!(out.exists());
    }

    #[cfg(unix)]
    #[test]
    fn tool_failures() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("va.png");
        let copy = tool("cp", &["{input}", "{output}"]);

        let err = export_figure(&figure(), &out, &tool("/nonexistent/tool", &[]), &copy)
            .unwrap_err();
        assert!(matches!(err, MapError::ToolUnavailable { .. }));
        assert_eq!(err.kind(), ErrorKind::Export);

        let err = export_figure(&figure(), &out, &tool("false", &[]), &copy).unwrap_err();
        assert!(matches!(err, MapError::ToolFailed { .. }));

        let err = export_figure(&figure(), &out, &tool("true", &[]), &copy).unwrap_err();
        assert!(matches!(err, MapError::ToolNoOutput { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn stale_image_is_not_taken_as_output() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("va.png");
        let copy = tool("cp", &["{input}", "{output}"]);
        export_figure(&figure(), &out, &copy, &copy).unwrap();
        assert!(out.exists());

        let err = export_figure(&figure(), &out, &tool("true", &[]), &copy).unwrap_err();
        assert!(matches!(err, MapError::ToolNoOutput { .. }));
        assert!(!out.exists());
    }
}
