//! A stable merge sort with a fallible comparator, since JSONata's
//! `^(...)`/`$sort` need to propagate a type error discovered mid-sort and
//! `slice::sort_by` has no room for that.

use crate::error::Result;
use std::cmp::Ordering;

pub fn stable_sort_by<T: Clone>(
    items: Vec<T>,
    cmp: impl Fn(&T, &T) -> Result<Ordering> + Copy,
) -> Result<Vec<T>> {
    if items.len() <= 1 {
        return Ok(items);
    }
    let mid = items.len() / 2;
    let (left, right) = items.split_at(mid);
    let left = stable_sort_by(left.to_vec(), cmp)?;
    let right = stable_sort_by(right.to_vec(), cmp)?;
    merge(left, right, cmp)
}

fn merge<T: Clone>(left: Vec<T>, right: Vec<T>, cmp: impl Fn(&T, &T) -> Result<Ordering>) -> Result<Vec<T>> {
    let mut out = Vec::with_capacity(left.len() + right.len());
    let mut li = left.into_iter().peekable();
    let mut ri = right.into_iter().peekable();
    loop {
        match (li.peek(), ri.peek()) {
            (Some(l), Some(r)) => {
                if cmp(l, r)? != Ordering::Greater {
                    out.push(li.next().unwrap());
                } else {
                    out.push(ri.next().unwrap());
                }
            }
            (Some(_), None) => out.push(li.next().unwrap()),
            (None, Some(_)) => out.push(ri.next().unwrap()),
            (None, None) => break,
        }
    }
    Ok(out)
}
