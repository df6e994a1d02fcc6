use reprep::segment::{cut_bounds, segment, segment_with_time};
use reprep::PrepError;

fn series() -> (Vec<i32>, Vec<f64>) {
    (vec![1, 1, 1, 2, 2, 2, 2, 3, 3, 3], (1..=10).map(f64::from).collect())
}

#[test]
fn reference_example() {
    let (y, t) = series();
    let pieces = segment(&y, &t, &[3.0, 7.5]).unwrap();
    assert_eq!(pieces, vec![&[1, 1, 1][..], &[2, 2, 2, 2, 3][..], &[3, 3][..]]);
    assert_eq!(pieces.iter().map(|p| p.len()).sum::<usize>(), 10);
}

#[test]
fn ascending_cuts_reconstruct_input() {
    let y: Vec<u8> = (0..500).map(|i| u8::from((120..300).contains(&i))).collect();
    let t: Vec<f64> = (0..500).map(|i| 61.5 + i as f64 * 1e-3).collect();
    let cuts = [61.55, 61.62, 61.62001, 61.8, 61.95];
    let (pieces, tp) = segment_with_time(&y, &t, &cuts).unwrap();
    assert_eq!(pieces.len(), cuts.len() + 1);
    assert_eq!(pieces.concat(), y);
    assert_eq!(tp.concat(), t);
}

#[test]
fn cut_bounds_are_half_open() {
    let (_, t) = series();
    assert_eq!(cut_bounds(&t, &[3.0, 7.5]).unwrap(), vec![(0, 3), (3, 8), (8, 10)]);
}

#[test]
fn cut_outside_range_fails() {
    let (y, t) = series();
    for cut in [0.99, 10.01, f64::NAN] {
        assert!(matches!(segment(&y, &t, &[2.0, cut]), Err(PrepError::OutOfBoundsCut { .. })));
    }
}

#[test]
fn cut_on_empty_series_fails() {
    let empty: [f64; 0] = [];
    assert!(matches!(segment(&empty, &empty, &[1.0]), Err(PrepError::OutOfBoundsCut { .. })));
    assert_eq!(segment(&empty, &empty, &[]).unwrap().len(), 1);
}

#[test]
fn duplicate_cut_yields_empty_piece() {
    let (y, t) = series();
    let pieces = segment(&y, &t, &[4.0, 4.0]).unwrap();
    assert_eq!(pieces[0], &[1, 1, 1, 2]);
    assert!(pieces[1].is_empty());
    assert_eq!(pieces[2].len(), 6);
}
