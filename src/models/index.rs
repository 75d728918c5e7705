use crate::models::common::TargetIndex;

/// 1人の射手が必要とする的の数 (練習弾数 ÷ 1的あたりの弾数)
///
/// 1的あたりの弾数が0の場合は0を返します。
pub fn number_of_targets(exercise: u32, exercise_mode: u32) -> u32 {
    exercise.checked_div(exercise_mode).unwrap_or(0)
}

/// 番号を生成順に列挙
///
/// 交代 → 標的台 (指定順、0 は除外) → 的 の順に入れ子で走査します。
/// `number_of_targets` が0の場合は空になります。
pub fn target_indices(shifts: u32, shields: &[u32], number_of_targets: u32) -> Vec<TargetIndex> {
    let mut indices = Vec::new();

    for shift in 1..=shifts {
        for &shield in shields.iter().filter(|&&s| s != 0) {
            for target in 1..=number_of_targets {
                indices.push(TargetIndex::new(shift, shield, target));
            }
        }
    }

    indices
}

/// 番号コード (6桁) を生成順に返す
pub fn generate(shifts: u32, shields: &[u32], number_of_targets: u32) -> Vec<String> {
    target_indices(shifts, shields, number_of_targets)
        .iter()
        .map(TargetIndex::code)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_nested_order() {
        let codes = generate(2, &[2, 5], 2);
        assert_eq!(
            codes,
            vec!["010201", "010202", "010501", "010502", "020201", "020202", "020501", "020502"]
        );
    }

    #[test]
    fn test_generate_keeps_supplied_shield_order() {
        let codes = generate(1, &[7, 3], 1);
        assert_eq!(codes, vec!["010701", "010301"]);
    }

    #[test]
    fn test_zero_shield_is_skipped() {
        let codes = generate(3, &[0, 4, 0, 9], 4);
        assert_eq!(codes.len(), 3 * 2 * 4);
        assert!(codes.iter().all(|c| &c[2..4] != "00"));
    }

    #[test]
    fn test_zero_targets_yields_empty() {
        assert!(generate(5, &[1, 2], 0).is_empty());
        assert!(generate(0, &[1, 2], 4).is_empty());
        assert!(generate(2, &[], 4).is_empty());
    }

    #[test]
    fn test_generate_is_deterministic() {
        assert_eq!(generate(4, &[3, 1, 2], 6), generate(4, &[3, 1, 2], 6));
    }

    #[test]
    fn test_number_of_targets() {
        assert_eq!(number_of_targets(40, 2), 20);
        assert_eq!(number_of_targets(60, 1), 60);
        assert_eq!(number_of_targets(30, 5), 6);
        assert_eq!(number_of_targets(22, 5), 4);
        assert_eq!(number_of_targets(20, 0), 0);
    }
}
