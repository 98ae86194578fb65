//! Sequence Similarity
//!
//! 퍼지 검색용 Ratcliff/Obershelp 유사도.
//! 일치 블록은 "가장 긴 공통 부분 문자열"을 찾고 그 좌우를 재귀적으로 나눠 찾는다.
//! 편집 거리 기반이 아니다.

use std::collections::HashMap;

/// 퍼지 검색 채택 기준
pub const FUZZY_CUTOFF: f64 = 0.6;

/// `2 * M / (|a| + |b|)`. 둘 다 비어 있으면 1.0.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matched = matching_chars(&a, &b);
    2.0 * matched as f64 / total as f64
}

/// `candidate`가 `term`과 기준 이상으로 비슷한가
pub fn is_close_match(term: &str, candidate: &str) -> bool {
    ratio(candidate, term) >= FUZZY_CUTOFF
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, ch) in b.iter().enumerate() {
        b2j.entry(*ch).or_default().push(j);
    }

    let mut matched = 0;
    let mut queue = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let (i, j, k) = longest_match(a, &b2j, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        matched += k;
        if alo < i && blo < j {
            queue.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            queue.push((i + k, ahi, j + k, bhi));
        }
    }
    matched
}

/// `a[alo..ahi]`, `b[blo..bhi]` 구간에서 가장 긴 공통 블록 `(i, j, len)`.
/// 길이가 같으면 a에서 먼저, 그다음 b에서 먼저 시작하는 블록을 고른다.
fn longest_match(
    a: &[char],
    b2j: &HashMap<char, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_len) = (alo, blo, 0);
    // j2len[j] = a[..i], b[..=j] 에서 b[j]로 끝나는 공통 블록 길이
    let mut j2len: HashMap<usize, usize> = HashMap::new();

    for (i, ch) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut next: HashMap<usize, usize> = HashMap::new();
        if let Some(positions) = b2j.get(ch) {
            for &j in positions {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let k = j
                    .checked_sub(1)
                    .and_then(|prev| j2len.get(&prev))
                    .copied()
                    .unwrap_or(0)
                    + 1;
                next.insert(j, k);
                if k > best_len {
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                    best_len = k;
                }
            }
        }
        j2len = next;
    }

    (best_i, best_j, best_len)
}
