use std::sync::Mutex;

use crate::line_table::{GrowthMode, LineTable};
use crate::line_view::LineView;

const NR_BUCKETS: usize = 256;

/// Sorts `lines` in place using up to `threads` worker threads (§4.4).
///
/// First-byte bucket partitioning resolves the first key byte globally in
/// `O(N)`, then each of the (at most 256) non-empty buckets is quicksorted
/// by exactly one worker, coordinated through a shared cursor protected by
/// a mutex. Workers join before this call returns - no worker outlives a
/// single sort invocation (§5).
pub(crate) fn sort<'a>(lines: &mut [LineView<'a>], threads: usize) {
    if lines.len() < 2 {
        return;
    }
    let threads = threads.max(1);

    // first-byte histogram
    let mut counts = [0usize; NR_BUCKETS];
    for line in lines.iter() {
        counts[line.bucket() as usize] += 1;
    }

    // bucket allocation, sized exactly so scatter never reallocates
    let buckets: Vec<Mutex<LineTable<'a>>> = (0..NR_BUCKETS)
        .map(|b| Mutex::new(LineTable::with_capacity(GrowthMode::Exact, counts[b])))
        .collect();

    // scatter
    for &line in lines.iter() {
        buckets[line.bucket() as usize].lock().unwrap().push(line);
    }

    // parallel quicksort of buckets, coordinated by a shared cursor; each
    // bucket's own mutex is only ever touched by the one worker that
    // claimed it, so it is never actually contended
    let cursor = Mutex::new(0usize);
    let buckets_ref = &buckets;
    let cursor_ref = &cursor;
    std::thread::scope(|scope| {
        for _ in 0..threads {
            scope.spawn(move || worker_loop(buckets_ref, cursor_ref));
        }
    });

    // gather: overwrite the original slice with buckets in ascending byte order
    let mut k = 0;
    for bucket in &buckets {
        for &line in bucket.lock().unwrap().as_slice() {
            lines[k] = line;
            k += 1;
        }
    }
}

/// One worker's loop: repeatedly claim the next non-empty bucket under the
/// cursor mutex, then sort it after releasing the cursor lock.
fn worker_loop(buckets: &[Mutex<LineTable<'_>>], cursor: &Mutex<usize>) {
    loop {
        let i = {
            let mut guard = cursor.lock().unwrap();
            let mut i = *guard;
            while i < NR_BUCKETS && buckets[i].lock().unwrap().is_empty() {
                i += 1;
            }
            *guard = i + 1;
            i
        };
        if i >= NR_BUCKETS {
            break;
        }
        let mut bucket = buckets[i].lock().unwrap();
        quicksort(bucket.as_mut_slice());
    }
}

/// Recursive, in-place quicksort with pivot = middle element, matching the
/// Lomuto-free partition scheme of §4.4: advance `i` right while
/// `lines[i] < pivot`, `j` left while `lines[j] > pivot`, swap on crossing,
/// recurse on the two halves.
fn quicksort<'a>(lines: &mut [LineView<'a>]) {
    let len = lines.len();
    if len < 2 {
        return;
    }

    let pivot = lines[len / 2];
    let mut i = 0isize;
    let mut j = len as isize - 1;
    loop {
        while lines[i as usize] < pivot {
            i += 1;
        }
        while lines[j as usize] > pivot {
            j -= 1;
        }
        if i >= j {
            break;
        }
        lines.swap(i as usize, j as usize);
        i += 1;
        j -= 1;
    }

    let split = i as usize;
    let (left, right) = lines.split_at_mut(split);
    quicksort(left);
    quicksort(right);
}
