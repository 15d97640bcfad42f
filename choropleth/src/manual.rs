/*!

This is the long-form manual for `choropleth` and `votemap`.

## Overview

`votemap` reads the results of an election for a set of regions (counties,
districts, ...), colors each region according to its winner and the strength
of the win, and draws the regions on their geographic shapes. A legend with the
overall results, the color scale and past results is placed to the right of
the map.

```text
votemap --config va_2024.json
votemap --input results.csv --boundaries counties.geojson --out map.png --no-legend
```

The path of the image is printed on success. On failure, the error is printed
and the program exits with the code 1. Pass `--verbose` (or set `RUST_LOG`)
to see the progress of each stage.

## Input formats

### Results

The results are the first sheet of an Excel file (`.xlsx`) or a CSV file with
a header line. Each line describes one region:

| id    | county    | Sanders | Christie |
|-------|-----------|---------|----------|
| 51013 | Arlington | 600     | 400      |
| 51059 | Fairfax   | 250     | 750      |

- the identifier must match a shape of the boundaries file. Use `idWidth` to
  restore the leading zeros of codes that Excel stored as numbers.
- the names of the regions are read from `nameColumn`, or from a column called
  `name` or `county`. The other columns are the candidates, unless
  `candidateColumns` lists them.
- vote counts are non-negative integers. A missing count is an error, and
  the error gives the line of the file.
- empty lines are skipped.

Instead of vote counts, a region can be described by a single signed result
between -100 and 100 (`resultColumn`). Positive values go to the first color
ramp of the palette and negative values to the second one.

### Boundaries

The shapes are read from a GeoJSON feature collection. Only `Polygon` and
`MultiPolygon` geometries are drawn, and a region with results but without
such a shape is an error. The identifier of a feature is read from
the `GEOID` property by default (`idProperty`), and from the `id` of the feature
when the property is missing.

### Places

Optionally, a second table with the columns `name`, `lat` and `lon` lists
places (such as cities) that are marked on top of the map.

## Colors

The color of a region is selected in two steps:
- the winner selects a color ramp. A winner without a ramp gets `colorOther`.
  A tie between the leading candidates, or a region without votes, gets
  `colorTie`.
- the share of the winner (or the margin with the runner-up, with
  `"shadeBy": "margin"`) selects the shade. With thresholds `t0 < t1 < ... < tn`
  the value `v` gets the shade `i` when `t_i < v <= t_{i+1}`.

The default palette uses the thresholds `40, 50, 60, 70, 80, 90, 100`, a green
ramp for the first candidate column and an orange ramp for the second one. With
a `resultColumn`, the ramps are for the positive and the negative results.

## Configuration

```json
{
  "outputSettings": {
    "mapName": "Virginia 2024",
    "outputPath": "va_2024.png",
    "width": 1000,
    "height": 500,
    "viewBox": "0 0 1000 500",
    "drawLegend": true,
    "legendPath": "va_2024_legend.svg"
  },
  "dataSource": {
    "provider": "csv",
    "filePath": "va_2024.csv",
    "idColumn": "id",
    "idWidth": 5,
    "nameColumn": "county",
    "candidateColumns": ["Sanders", "Christie"]
  },
  "boundaries": {
    "filePath": "counties.geojson",
    "idProperty": "GEOID",
    "projection": "mercator"
  },
  "palette": {
    "shadeBy": "share",
    "thresholds": [40, 50, 60, 70, 80, 90, 100],
    "ramps": [
      {"category": "Sanders", "colors": ["#AFE9AF", "#73D873", "#42CA42", "#30A630", "#217821", "#165016"]},
      {"category": "Christie", "colors": ["#FEE391", "#FED463", "#FE9929", "#EC7014", "#CC4C02", "#8C2D04"]}
    ],
    "colorOther": "#696969",
    "colorTie": "#EEEEEE"
  },
  "legend": {
    "candidates": [
      {"name": "Sanders/Manchin (P)", "category": "Sanders"},
      {"name": "Christie/Ayotte (U)", "category": "Christie"}
    ],
    "turnout": 77.4,
    "pastResults": [{"year": "2020", "category": "Sanders", "share": 54.1}],
    "columnLabels": ["P", "U"]
  },
  "placesSource": {"filePath": "cities.csv"},
  "renderer": {"program": "rsvg-convert", "args": ["--width", "{width}", "--height", "{height}", "--output", "{output}", "{input}"]},
  "converter": {"program": "magick", "args": ["{input}", "{output}"]}
}
```

Only `outputSettings.outputPath`, `dataSource.filePath` and
`boundaries.filePath` are required. Relative paths are relative to the
directory of the configuration file.

When the legend candidates are not listed, they are computed from the sum of
the votes of all the regions. A candidate without a share gets its share from
these totals.

## Output formats

The extension of the output path selects the format:
- `.svg`: the figure is written directly.
- `.png`: the figure is written as SVG next to the image, then rendered by the
  `renderer` program (`rsvg-convert` by default).
- anything else: the PNG image is converted by the `converter` program
  (`magick` by default).

*/
