use inciser_camtools::hole_grid::{HoleGridParameters, Segment, TaperedBlock, MAX_HOLES};
use inciser_core::GeometryError;
use proptest::prelude::*;

const EPS: f64 = 1e-6;

fn sample_block() -> TaperedBlock {
    TaperedBlock::new(
        vec![Segment::new(0.0, 0.0, 50.0), Segment::new(-10.0, 50.0, 70.0)],
        7.0,
    )
    .unwrap()
}

#[test]
fn test_rejects_too_few_segments() {
    let err = TaperedBlock::new(vec![Segment::new(0.0, 0.0, 50.0)], 7.0).unwrap_err();
    assert_eq!(err, GeometryError::TooFewSegments { count: 1 });
}

#[test]
fn test_rejects_unordered_segments() {
    let err = TaperedBlock::new(
        vec![
            Segment::new(0.0, 0.0, 50.0),
            Segment::new(0.0, 20.0, 50.0),
            Segment::new(0.0, 20.0, 50.0),
        ],
        7.0,
    )
    .unwrap_err();
    assert_eq!(
        err,
        GeometryError::UnorderedSegments {
            index: 2,
            previous: 20.0,
            current: 20.0
        }
    );
}

#[test]
fn test_rejects_invalid_margin_and_interval() {
    let segments = vec![Segment::new(0.0, 0.0, 50.0), Segment::new(0.0, 50.0, 50.0)];
    assert!(matches!(
        TaperedBlock::new(segments.clone(), -1.0),
        Err(GeometryError::InvalidMargin { .. })
    ));
    assert!(matches!(
        TaperedBlock::new(vec![Segment::new(f64::NAN, 0.0, 1.0), segments[1]], 0.0),
        Err(GeometryError::NonFiniteSegment { index: 0 })
    ));

    let block = TaperedBlock::new(segments, 1.0).unwrap();
    assert!(matches!(
        block.holes(0.0, true),
        Err(GeometryError::InvalidInterval { .. })
    ));
}

#[test]
fn test_edge_at_segments_and_clamped() {
    let block = sample_block();
    let start = block.edge(0.0);
    assert_eq!((start.offset, start.width), (0.0, 50.0));
    let end = block.edge(50.0);
    assert_eq!((end.offset, end.width), (-10.0, 70.0));

    let below = block.edge(-100.0);
    assert_eq!((below.offset, below.width), (0.0, 50.0));
    let above = block.edge(400.0);
    assert_eq!((above.offset, above.width), (-10.0, 70.0));
}

#[test]
fn test_edge_interpolates_by_y() {
    let block = TaperedBlock::new(
        vec![
            Segment::new(0.0, 0.0, 140.0),
            Segment::new(8.0, 1200.0, 140.0),
            Segment::new(8.0, 3875.0, 100.0),
        ],
        7.0,
    )
    .unwrap();
    let mid = block.edge(600.0);
    assert!((mid.offset - 4.0).abs() < EPS);
    assert!((mid.width - 140.0).abs() < EPS);

    let interior = block.edge(1200.0);
    assert!((interior.offset - 8.0).abs() < EPS);

    let later = block.edge(1200.0 + 2675.0 / 2.0);
    assert!((later.offset - 8.0).abs() < EPS);
    assert!((later.width - 120.0).abs() < EPS);
}

#[test]
fn test_reference_block_first_row() {
    let block = sample_block();
    let dims = block.dimensions(8.0, true).unwrap();
    // round(36 / 8) + 1
    assert_eq!(dims.columns, 6);

    let holes = block.holes(8.0, true).unwrap();
    let first_row: Vec<f64> = holes.iter().filter(|h| h.y == 7.0).map(|h| h.x).collect();
    assert_eq!(first_row.len(), dims.columns + 1);

    let edge = block.edge(7.0);
    for x in first_row {
        assert!(x >= edge.offset + 7.0 - EPS && x <= edge.offset + edge.width - 7.0 + EPS);
    }
}

#[test]
fn test_quantized_rows_use_exact_interval() {
    let holes = sample_block().holes(8.0, true).unwrap();
    let mut ys: Vec<f64> = holes.iter().map(|h| h.y).collect();
    ys.dedup();
    assert_eq!(ys, vec![7.0, 15.0, 23.0, 31.0, 39.0]);
}

#[test]
fn test_unquantized_rows_span_height() {
    let holes = sample_block().holes(8.0, false).unwrap();
    let max_y = holes.iter().map(|h| h.y).fold(f64::MIN, f64::max);
    assert!((max_y - 43.0).abs() < EPS);
}

#[test]
fn test_odd_rows_interleave() {
    let holes = sample_block().holes(8.0, true).unwrap();
    let row0 = holes.iter().filter(|h| h.y == 7.0).count();
    let row1 = holes.iter().filter(|h| h.y == 15.0).count();
    assert_eq!(row1, row0 - 1);
}

#[test]
fn test_parameters_build() {
    let params = HoleGridParameters {
        segments: vec![Segment::new(0.0, 0.0, 50.0), Segment::new(-10.0, 50.0, 70.0)],
        margin: 7.0,
    };
    let block = params.build().unwrap();
    assert_eq!(block.segments().len(), 2);
    assert_eq!(block.margin(), 7.0);
    assert_eq!(block, sample_block());
}

#[test]
fn test_interval_too_fine_for_long_block() {
    let block = TaperedBlock::new(
        vec![
            Segment::new(0.0, 0.0, 140.0),
            Segment::new(8.0, 1200.0, 140.0),
            Segment::new(8.0, 3875.0, 100.0),
        ],
        7.0,
    )
    .unwrap();

    assert_eq!(
        block.holes(0.001, true).unwrap_err(),
        GeometryError::TooManyHoles {
            interval: 0.001,
            limit: MAX_HOLES
        }
    );
    assert!(block.holes(8.0, true).unwrap().len() < MAX_HOLES);
}

#[test]
fn test_margin_too_large_yields_nothing() {
    let block = TaperedBlock::new(
        vec![Segment::new(0.0, 0.0, 50.0), Segment::new(0.0, 10.0, 50.0)],
        6.0,
    )
    .unwrap();
    assert!(block.holes(4.0, true).unwrap().is_empty());
}

fn taper() -> impl Strategy<Value = Vec<Segment>> {
    prop::collection::vec((-20.0f64..20.0, 5.0f64..200.0, 40.0f64..150.0), 2..6).prop_map(
        |raw| {
            let mut y = 0.0;
            raw.into_iter()
                .map(|(x, dy, width)| {
                    let segment = Segment::new(x, y, width);
                    y += dy;
                    segment
                })
                .collect()
        },
    )
}

proptest! {
    #[test]
    fn edge_stays_between_neighbours(segments in taper(), t in 0.0f64..1.0) {
        let block = TaperedBlock::new(segments.clone(), 0.0).unwrap();
        for pair in segments.windows(2) {
            let y = pair[0].y + t * (pair[1].y - pair[0].y);
            let edge = block.edge(y);
            let (lo_x, hi_x) = (pair[0].x.min(pair[1].x), pair[0].x.max(pair[1].x));
            let (lo_w, hi_w) = (pair[0].width.min(pair[1].width), pair[0].width.max(pair[1].width));
            prop_assert!(edge.offset >= lo_x - EPS && edge.offset <= hi_x + EPS);
            prop_assert!(edge.width >= lo_w - EPS && edge.width <= hi_w + EPS);
        }
    }

    #[test]
    fn holes_stay_inside_inset(
        segments in taper(),
        margin in 0.0f64..15.0,
        interval in 2.0f64..20.0,
        quantize in any::<bool>(),
    ) {
        let block = TaperedBlock::new(segments, margin).unwrap();
        let y0 = block.origin_y();
        let height = block.height();
        prop_assume!(2.0 * margin < height);

        for hole in block.holes(interval, quantize).unwrap() {
            let edge = block.edge(hole.y);
            prop_assert!(hole.x >= edge.offset + margin - EPS);
            prop_assert!(hole.x <= edge.offset + edge.width - margin + EPS);
            prop_assert!(hole.y >= y0 + margin - EPS);
            prop_assert!(hole.y <= y0 + height - margin + EPS);
        }
    }
}
