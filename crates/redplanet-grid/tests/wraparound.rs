//! Edge-of-grid behaviour on realistically padded global grids.

use approx::assert_abs_diff_eq;
use redplanet_grid::{Array2, GridBuilder, GriddedData, LonConvention, Squeezed};

/// Global 0.1 degree grid in signed longitude, values unique per node.
fn tenth_degree_grid() -> GriddedData {
    let lon: Vec<f64> = (0..3600).map(|i| -180.0 + 0.1 * i as f64).collect();
    let lat: Vec<f64> = (0..1800).map(|j| -89.95 + 0.1 * j as f64).collect();
    let value = Array2::from_fn(lat.len(), lon.len(), |r, c| (r * 10_000 + c) as f64);
    GridBuilder::new(lon, lat, LonConvention::Signed)
        .variable("value", value)
        .pad_wraparound()
        .unwrap()
        .build()
        .unwrap()
}

#[test]
fn test_padding_extends_axes() {
    let grid = tenth_degree_grid();
    let lon = grid.lon();
    assert_eq!(lon.len(), 3602);
    assert_abs_diff_eq!(lon[3600], 180.0, epsilon = 1e-9);
    assert_abs_diff_eq!(lon[3601], 180.1, epsilon = 1e-9);
    assert_eq!(grid.lat().len(), 1801);
    assert_abs_diff_eq!(grid.lat()[1800], 90.05, epsilon = 1e-9);
}

#[test]
fn test_nearest_at_last_valid_longitude_matches_wrapped_column() {
    let grid = tenth_degree_grid();
    let at_edge = grid.get_value(179.999, 10.0, "value").unwrap();
    let wrapped = grid.get_value(-180.0, 10.0, "value").unwrap();
    assert_eq!(at_edge, wrapped);

    // 180 in positive convention is -180 signed.
    assert_eq!(grid.get_value(180.0, 10.0, "value").unwrap(), wrapped);
}

#[test]
fn test_nearest_at_north_pole_uses_duplicated_row() {
    let grid = tenth_degree_grid();
    let pole = grid.get_value(0.0, 90.0, "value").unwrap();
    let last_row = grid.get_value(0.0, 89.95, "value").unwrap();
    assert_eq!(pole, last_row);
}

#[test]
fn test_bilinear_exact_on_nodes() {
    let grid = tenth_degree_grid();
    for (lon_i, lat_j) in [(0usize, 0usize), (1234, 567), (3599, 1799), (1800, 900)] {
        let lon = grid.lon()[lon_i];
        let lat = grid.lat()[lat_j];
        let raw = grid.variable("value").unwrap().get(lat_j, lon_i);
        assert_eq!(grid.interpolate_value(lon, lat, "value").unwrap(), raw);
    }
}

#[test]
fn test_bilinear_across_antimeridian() {
    let grid = tenth_degree_grid();
    // Halfway between the last column (179.9) and the wrapped first column.
    let row = 900;
    let lat = grid.lat()[row];
    let v = grid.variable("value").unwrap();
    let expected = 0.5 * (v.get(row, 3599) + v.get(row, 0));
    assert_abs_diff_eq!(grid.interpolate_value(179.95, lat, "value").unwrap(), expected, epsilon = 1e-6);
    // 180 itself is the wrapped first column.
    assert_abs_diff_eq!(grid.interpolate_value(180.0, lat, "value").unwrap(), v.get(row, 0), epsilon = 1e-6);
}

#[test]
fn test_bilinear_at_pole_needs_no_special_case() {
    let grid = tenth_degree_grid();
    let top = grid.interpolate_value(0.0, 90.0, "value").unwrap();
    assert_abs_diff_eq!(top, grid.variable("value").unwrap().get(1799, 1800), epsilon = 1e-6);
}

#[test]
fn test_positive_grid_wraps_below_first_column() {
    // Bouguer-style axis: offset by 1/32 so 0 itself is not a node.
    let lon: Vec<f64> = (0..8).map(|i| 45.0 * i as f64 + 1.0 / 32.0).collect();
    let lat = vec![-45.0, 45.0];
    let grid = GridBuilder::new(lon, lat, LonConvention::Positive)
        .variable("v", Array2::from_fn(2, 8, |_, c| c as f64))
        .pad_wraparound()
        .unwrap()
        .build()
        .unwrap();

    // 0 deg sits between column 7 (315.03) and the wrapped column 0 (360.03).
    let v = grid.interpolate_value(0.0, -45.0, "v").unwrap();
    assert!(v > 0.0 && v < 7.0, "{}", v);
    assert_abs_diff_eq!(v, 7.0 * (1.0 / 32.0) / 45.0, epsilon = 1e-9);
}

#[test]
fn test_vector_query_squeezes() {
    let grid = tenth_degree_grid();
    let s = grid
        .get_values(&vec![-180.0, 0.0, 179.9], &[[0.05]], "value")
        .unwrap();
    match s.squeeze() {
        Squeezed::Vector(v) => assert_eq!(v.len(), 3),
        other => panic!("unexpected {:?}", other),
    }
}
