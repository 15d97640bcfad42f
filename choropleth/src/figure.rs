//! The in-memory figure and its SVG serialization.
//!
//! Coordinates are in SVG user units: the origin is the top-left corner and
//! the y axis points down.

use svg::node::element::{Circle, Line, Path, Rectangle as Rect, Text, SVG};
use svg::node::{Node, Text as TextContent};
use svg::Document;

use crate::config::*;

#[derive(PartialEq, Debug, Clone, Copy)]
pub struct Stroke {
    pub color: Color,
    pub width: f64,
    /// Dash pattern, as in `stroke-dasharray`.
    pub dash: Option<(f64, f64)>,
}

impl Stroke {
    pub fn solid(color: Color, width: f64) -> Stroke {
        Stroke {
            color,
            width,
            dash: None,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum TextAnchor {
    Start,
    Middle,
    End,
}

#[derive(PartialEq, Debug, Clone)]
pub struct TextStyle {
    pub size: f64,
    pub color: Color,
    pub family: String,
    pub anchor: TextAnchor,
}

impl TextStyle {
    pub fn new(size: f64) -> TextStyle {
        TextStyle {
            size,
            color: Color::BLACK,
            family: "Roboto".to_string(),
            anchor: TextAnchor::Middle,
        }
    }

    pub fn anchor(self, anchor: TextAnchor) -> TextStyle {
        TextStyle { anchor, ..self }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub enum Element {
    /// A closed shape. `d` is the content of the SVG `d` attribute.
    Path {
        id: Option<String>,
        d: String,
        fill: Option<Color>,
        stroke: Option<Stroke>,
    },
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        fill: Color,
    },
    Circle {
        cx: f64,
        cy: f64,
        r: f64,
        fill: Option<Color>,
        stroke: Option<Stroke>,
    },
    Line {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        stroke: Stroke,
    },
    /// Text centered vertically on `y`.
    Text {
        x: f64,
        y: f64,
        text: String,
        style: TextStyle,
    },
    /// Another figure, drawn with its top-left corner at `(x, y)`.
    Nested { x: f64, y: f64, figure: Box<Figure> },
}

/// The visible area of a figure, in user units.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct ViewBox {
    pub min_x: f64,
    pub min_y: f64,
    pub width: f64,
    pub height: f64,
}

impl ViewBox {
    /// Parses the four numbers of a `viewBox` attribute, for example `"350 245 300 30"`.
    pub fn parse(s: &str) -> Result<ViewBox, ChoroplethErrors> {
        let nums: Vec<f64> = s
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|p| !p.is_empty())
            .map(|p| p.parse::<f64>())
            .collect::<Result<Vec<f64>, _>>()
            .map_err(|_| ChoroplethErrors::InvalidViewBox(s.to_string()))?;
        match nums.as_slice() {
            [min_x, min_y, width, height] if *width > 0.0 && *height > 0.0 => Ok(ViewBox {
                min_x: *min_x,
                min_y: *min_y,
                width: *width,
                height: *height,
            }),
            _ => Err(ChoroplethErrors::InvalidViewBox(s.to_string())),
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct Figure {
    pub width: f64,
    pub height: f64,
    pub view_box: Option<ViewBox>,
    pub background: Option<Color>,
    pub elements: Vec<Element>,
}

impl Figure {
    /// The content of all the text elements, nested figures included.
    pub fn texts(&self) -> Vec<&str> {
        let mut res: Vec<&str> = Vec::new();
        for elt in self.elements.iter() {
            match elt {
                Element::Text { text, .. } => res.push(text.as_str()),
                Element::Nested { figure, .. } => res.extend(figure.texts()),
                _ => {}
            }
        }
        res
    }

    pub fn new(width: f64, height: f64) -> Figure {
        Figure {
            width,
            height,
            view_box: None,
            background: Some(Color::WHITE),
            elements: Vec::new(),
        }
    }

    pub fn push(&mut self, element: Element) {
        self.elements.push(element);
    }

    pub fn add_text(&mut self, x: f64, y: f64, text: &str, style: TextStyle) {
        self.push(Element::Text {
            x,
            y,
            text: text.to_string(),
            style,
        });
    }

    pub fn add_rect(&mut self, x: f64, y: f64, width: f64, height: f64, fill: Color) {
        self.push(Element::Rect {
            x,
            y,
            width,
            height,
            fill,
        });
    }

    /// Places two figures next to each other, the left one first.
    ///
    /// The result is as wide as both figures and as tall as the tallest one.
    pub fn beside(left: Figure, right: Figure) -> Figure {
        let mut res = Figure::new(left.width + right.width, left.height.max(right.height));
        let offset = left.width;
        res.push(Element::Nested {
            x: 0.0,
            y: 0.0,
            figure: Box::new(left),
        });
        res.push(Element::Nested {
            x: offset,
            y: 0.0,
            figure: Box::new(right),
        });
        res
    }

    /// Serializes the figure as a standalone SVG document.
    pub fn to_svg(&self) -> String {
        let root = Document::new().set("xmlns", "http://www.w3.org/2000/svg");
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}\n",
            self.to_node(root)
        )
    }

    fn to_node(&self, node: SVG) -> SVG {
        let vb = self.view_box.unwrap_or(ViewBox {
            min_x: 0.0,
            min_y: 0.0,
            width: self.width,
            height: self.height,
        });
        let mut node = node
            .set("width", num(self.width))
            .set("height", num(self.height))
            .set(
                "viewBox",
                format!(
                    "{} {} {} {}",
                    num(vb.min_x),
                    num(vb.min_y),
                    num(vb.width),
                    num(vb.height)
                ),
            );
        if let Some(bg) = self.background {
            node = node.add(
                Rect::new()
                    .set("x", num(vb.min_x))
                    .set("y", num(vb.min_y))
                    .set("width", num(vb.width))
                    .set("height", num(vb.height))
                    .set("fill", bg.to_string()),
            );
        }
        self.elements.iter().fold(node, add_element)
    }
}

fn add_element(node: SVG, elt: &Element) -> SVG {
    match elt {
        Element::Path {
            id,
            d,
            fill,
            stroke,
        } => {
            let mut path = Path::new().set("d", d.as_str()).set("fill-rule", "evenodd");
            if let Some(id) = id {
                path = path.set("id", id.as_str());
            }
            node.add(paint(path, fill, stroke))
        }
        Element::Rect {
            x,
            y,
            width,
            height,
            fill,
        } => node.add(
            Rect::new()
                .set("x", num(*x))
                .set("y", num(*y))
                .set("width", num(*width))
                .set("height", num(*height))
                .set("fill", fill.to_string()),
        ),
        Element::Circle {
            cx,
            cy,
            r,
            fill,
            stroke,
        } => {
            let circle = Circle::new()
                .set("cx", num(*cx))
                .set("cy", num(*cy))
                .set("r", num(*r));
            node.add(paint(circle, fill, stroke))
        }
        Element::Line {
            x1,
            y1,
            x2,
            y2,
            stroke,
        } => {
            let line = Line::new()
                .set("x1", num(*x1))
                .set("y1", num(*y1))
                .set("x2", num(*x2))
                .set("y2", num(*y2));
            node.add(paint(line, &None, &Some(*stroke)))
        }
        Element::Text { x, y, text, style } => {
            let anchor = match style.anchor {
                TextAnchor::Start => "start",
                TextAnchor::Middle => "middle",
                TextAnchor::End => "end",
            };
            node.add(
                Text::new()
                    .set("x", num(*x))
                    .set("y", num(*y))
                    .set("font-family", style.family.as_str())
                    .set("font-size", num(style.size))
                    .set("fill", style.color.to_string())
                    .set("text-anchor", anchor)
                    .set("dominant-baseline", "central")
                    .add(TextContent::new(text.as_str())),
            )
        }
        Element::Nested { x, y, figure } => {
            let nested = SVG::new().set("x", num(*x)).set("y", num(*y));
            node.add(figure.to_node(nested))
        }
    }
}

// Sets the fill and the stroke attributes of a shape.
fn paint<T: Node>(mut shape: T, fill: &Option<Color>, stroke: &Option<Stroke>) -> T {
    match fill {
        Some(c) => shape.assign("fill", c.to_string()),
        None => shape.assign("fill", "none"),
    }
    if let Some(s) = stroke {
        shape.assign("stroke", s.color.to_string());
        shape.assign("stroke-width", num(s.width));
        if let Some((on, off)) = s.dash {
            shape.assign("stroke-dasharray", format!("{} {}", num(on), num(off)));
        }
    }
    shape
}

/// Formats a coordinate with at most 3 decimals and without trailing zeros.
pub(crate) fn num(x: f64) -> String {
    let s = format!("{:.3}", x);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" || s.is_empty() {
        "0".to_string()
    } else {
        s.to_string()
    }
}
