use std::cmp::Ordering;
use std::collections::BTreeMap;

use tracing::debug;

use crate::core::config::LineGroupOptions;
use crate::core::confidence::mean;
use crate::core::model::{Detection, Line};

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent[rb] = ra;
        }
    }
}

// Grouping is purely geometric: two detections share a line when their
// boxes overlap vertically, regardless of what the texts say.
pub fn group_lines(detections: &[Detection], opts: &LineGroupOptions) -> Vec<Line> {
    if detections.is_empty() {
        return Vec::new();
    }

    let boxes: Vec<_> = detections.iter().map(|d| d.bbox.bbox()).collect();
    let mut union_find = UnionFind::new(detections.len());
    for i in 0..detections.len() {
        for j in i + 1..detections.len() {
            if boxes[i].vertical_overlap_ratio(&boxes[j]) > opts.line_overlap_threshold {
                union_find.union(i, j);
            }
        }
    }

    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for i in 0..detections.len() {
        groups.entry(union_find.find(i)).or_default().push(i);
    }

    let mut lines: Vec<Line> = groups
        .into_values()
        .map(|members| build_line(detections, members))
        .collect();
    // reading order, top to bottom
    lines.sort_by(|a, b| {
        let (ax, ay) = a.bbox.center();
        let (bx, by) = b.bbox.center();
        ay.partial_cmp(&by)
            .unwrap_or(Ordering::Equal)
            .then_with(|| ax.partial_cmp(&bx).unwrap_or(Ordering::Equal))
    });
    debug!(detections = detections.len(), lines = lines.len(), "line grouping");
    lines
}

fn build_line(detections: &[Detection], mut members: Vec<usize>) -> Line {
    members.sort_by(|&a, &b| {
        let ax = detections[a].bbox.bbox().center().0;
        let bx = detections[b].bbox.bbox().center().0;
        ax.partial_cmp(&bx)
            .unwrap_or(Ordering::Equal)
            .then_with(|| detections[a].text.cmp(&detections[b].text))
    });

    let members: Vec<Detection> = members.into_iter().map(|i| detections[i].clone()).collect();
    let text = members
        .iter()
        .map(|d| d.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let confidences: Vec<f32> = members.iter().map(|d| d.confidence).collect();
    let bbox = members
        .iter()
        .skip(1)
        .fold(members[0].bbox.bbox(), |acc, d| acc.union(&d.bbox.bbox()));

    Line {
        text,
        confidence: mean(&confidences),
        item_count: members.len(),
        bbox,
        detections: members,
    }
}
