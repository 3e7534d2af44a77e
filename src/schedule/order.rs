//! Dispatch ordering
//!
//! Two passes run in sequence: [`order`] sorts globally by priority and size,
//! then [`group_by_locality`] regroups by parent directory. The second pass
//! wins for the final dispatch order; only the size ordering survives inside
//! each directory.

use crate::classify::Classifier;
use crate::walk::FileDescriptor;
use std::collections::HashMap;
use std::path::PathBuf;

/// Stable sort by `(priority, size)`, both ascending
pub fn order(classifier: &Classifier, descriptors: Vec<FileDescriptor>) -> Vec<FileDescriptor> {
    let mut keyed: Vec<(i32, FileDescriptor)> = descriptors
        .into_iter()
        .map(|d| (classifier.priority(&d), d))
        .collect();

    // sort_by_key is stable
    keyed.sort_by_key(|(priority, d)| (*priority, d.size_bytes));

    keyed.into_iter().map(|(_, d)| d).collect()
}

/// Cluster files by parent directory, biggest directories first.
///
/// Directories with the same member count keep the order in which they first
/// appeared in the input. Inside a directory files run smallest first. The
/// output is always a permutation of the input.
pub fn group_by_locality(ordered: Vec<FileDescriptor>) -> Vec<FileDescriptor> {
    let mut slots: HashMap<PathBuf, usize> = HashMap::new();
    let mut groups: Vec<Vec<FileDescriptor>> = Vec::new();

    for descriptor in ordered {
        let parent = descriptor.parent().to_path_buf();
        let slot = *slots.entry(parent).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(descriptor);
    }

    groups.sort_by(|a, b| b.len().cmp(&a.len()));

    groups
        .into_iter()
        .flat_map(|mut group| {
            group.sort_by_key(|d| d.size_bytes);
            group
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::rules::MIB;

    fn d(path: &str, size: u64) -> FileDescriptor {
        FileDescriptor::new(path, size)
    }

    #[test]
    fn test_order_priority_then_size() {
        let classifier = Classifier::default();
        let input = vec![
            d("/a/big.bin", 200 * MIB),  // 7
            d("/a/mid.bin", 50 * MIB),   // 5
            d("/a/notes.txt", 8 * 1024), // 2
            d("/a/small.bin", 4096),     // 4
            d("/a/data.csv", 2048),      // 2
        ];

        let ordered: Vec<String> = order(&classifier, input)
            .into_iter()
            .map(|d| d.file_name())
            .collect();

        assert_eq!(
            ordered,
            vec!["data.csv", "notes.txt", "small.bin", "mid.bin", "big.bin"]
        );
    }

    #[test]
    fn test_order_is_stable() {
        let classifier = Classifier::default();
        let input = vec![
            d("/x/first.bin", 4096),
            d("/y/second.bin", 4096),
            d("/z/third.bin", 4096),
        ];
        let ordered = order(&classifier, input.clone());
        assert_eq!(ordered, input);
    }

    #[test]
    fn test_group_by_locality_largest_directory_first() {
        let input = vec![
            d("/one/a.bin", 300),
            d("/two/b.bin", 500),
            d("/two/c.bin", 100),
            d("/three/d.bin", 10),
            d("/two/e.bin", 200),
            d("/one/f.bin", 100),
        ];

        let grouped: Vec<String> = group_by_locality(input)
            .iter()
            .map(|d| d.path.to_string_lossy().into_owned())
            .collect();

        assert_eq!(
            grouped,
            vec![
                "/two/c.bin",
                "/two/e.bin",
                "/two/b.bin",
                "/one/f.bin",
                "/one/a.bin",
                "/three/d.bin",
            ]
        );
    }

    #[test]
    fn test_group_by_locality_is_a_permutation() {
        let mut input = Vec::new();
        for dir in 0..7 {
            for file in 0..(dir * 3 + 1) {
                input.push(d(&format!("/root/d{dir}/f{file}.dat"), (file * 37 % 11) as u64));
            }
        }

        let grouped = group_by_locality(input.clone());
        assert_eq!(grouped.len(), input.len());

        let mut expected: Vec<_> = input.iter().map(|d| d.path.clone()).collect();
        let mut actual: Vec<_> = grouped.iter().map(|d| d.path.clone()).collect();
        expected.sort();
        actual.sort();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_group_by_locality_empty() {
        assert!(group_by_locality(Vec::new()).is_empty());
    }
}
