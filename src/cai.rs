//! Context Adaptive Interpolation: predict one missing pixel from its four
//! neighbors, detecting dominant gradients.

/// Predict a pixel from its neighbors in clockwise order starting at the
/// top: `[north, east, south, west]`.
///
/// If the neighborhood is flat (spread within `threshold`) the prediction is
/// the rounded average. A dominant horizontal or vertical gradient averages
/// along the edge instead of across it. Otherwise the median wins.
pub fn cai(neighbors: [u8; 4], threshold: i32) -> u8 {
    let (min, max, median) = min_max_median(neighbors);
    let [n, e, s, w] = neighbors.map(i32::from);

    // All returned averages round to nearest.
    if i32::from(max) - i32::from(min) <= threshold {
        return ((n + e + s + w + 2) / 4) as u8;
    }
    if abs_diff(e, w) - abs_diff(n, s) > threshold {
        return ((n + s + 1) / 2) as u8;
    }
    if abs_diff(n, s) - abs_diff(e, w) > threshold {
        return ((e + w + 1) / 2) as u8;
    }
    median
}

#[inline]
fn abs_diff(x: i32, y: i32) -> i32 {
    (x - y).abs()
}

/// Order statistics of four bytes via a fixed sorting network.
///
/// The median is the smaller of the two pair maxima for the pairing
/// `(p0,p1)`, `(p2,p3)`, which is always one of the two middle order
/// statistics.
pub fn min_max_median(p: [u8; 4]) -> (u8, u8, u8) {
    let mut b = [0u8; 4];
    if p[0] < p[1] {
        b[0] = p[0];
        b[1] = p[1];
    } else {
        b[0] = p[1];
        b[1] = p[0];
    }
    if p[2] < p[3] {
        b[2] = p[2];
        b[3] = p[3];
    } else {
        b[2] = p[3];
        b[3] = p[2];
    }
    if b[0] > b[2] {
        b.swap(0, 2);
    }
    if b[1] > b[3] {
        b.swap(1, 3);
    }
    (b[0], b[3], b[1])
}
