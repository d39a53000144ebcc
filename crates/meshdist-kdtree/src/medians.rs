//! Pivot selection for balanced construction.

use rand::Rng;

use crate::point::{Comparable, Point};

/// Partition `items` around the element at `pivot` along `plane`.
///
/// Items below the pivot's coordinate end up before it and items above it
/// after. Items tied with the pivot are split across both sides, with the
/// pivot placed in the middle of the run of equal keys, so duplicates do
/// not pile up on one side. Returns the pivot's final index. Runs in
/// linear time. Panics if `items` is empty.
pub fn partition<P, T>(items: &mut [T], pivot: usize, plane: usize) -> usize
where
    P: Point,
    T: Comparable<P>,
{
    let last = items.len() - 1;
    items.swap(pivot, last);
    let split = items[last].point();
    let mut index = 0;
    for i in 0..last {
        if items[i].compare_point(&split, plane) <= 0.0 {
            items.swap(index, i);
            index += 1;
        }
    }
    items.swap(last, index);

    // gather the ties at the end of the left side, just before the pivot
    let mut below = 0;
    for i in 0..index {
        if items[i].compare_point(&split, plane) < 0.0 {
            items.swap(below, i);
            below += 1;
        }
    }
    let mid = below + (index - below) / 2;
    items.swap(mid, index);
    mid
}

/// Estimate the median of `items` along `plane` from a random sample.
///
/// Moves up to `samples` randomly chosen items to the front of the slice,
/// selects their median in place and returns its index. When the slice is
/// no larger than the sample the true median is returned.
pub fn median_of_randoms<P, T, R>(items: &mut [T], plane: usize, samples: usize, rng: &mut R) -> usize
where
    P: Point,
    T: Comparable<P>,
    R: Rng + ?Sized,
{
    let len = items.len();
    let n = samples.clamp(1, len.max(1)).min(len);
    if n < len {
        for i in 0..n {
            let j = rng.gen_range(i..len);
            items.swap(i, j);
        }
    }
    let mid = n / 2;
    if n > 0 {
        items[..n].select_nth_unstable_by(mid, |a, b| {
            a.compare_point(&b.point(), plane).total_cmp(&0.0)
        });
    }
    mid
}

/// Choose and place the pivot for one level of construction.
pub(crate) fn pivot<P, T, R>(items: &mut [T], plane: usize, samples: usize, rng: &mut R) -> usize
where
    P: Point,
    T: Comparable<P>,
    R: Rng + ?Sized,
{
    let estimate = median_of_randoms(items, plane, samples, rng);
    partition(items, estimate, plane)
}
