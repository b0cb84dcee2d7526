//! Staged rev selection.

use rb_ir::RevStage;

/// Pick a rev stage from the current RPM and the gesture's peak throttle.
///
/// Lower RPM and a harder blip select a more intense stage. A stage that
/// would peak below the current RPM is bumped up to the first one that
/// reaches it. Returns `None` for a feather blip while already revving.
pub fn select_stage(stages: &[RevStage], rpm: f32, idle_rpm: f32, peak: f32) -> Option<usize> {
    if stages.is_empty() {
        return None;
    }
    if peak <= 0.1 && rpm > idle_rpm + 500.0 {
        return None;
    }

    let last = stages.len() - 1;
    let peak_at = |i: usize| stages[i.min(last)].peak_rpm;

    let chosen = if rpm < peak_at(0) * 0.8 {
        if peak < 0.4 {
            0
        } else if peak < 0.75 {
            1
        } else {
            2
        }
    } else if rpm < peak_at(1) * 0.8 {
        if peak < 0.5 {
            1
        } else {
            2
        }
    } else if rpm < peak_at(2) * 0.9 {
        if peak < 0.6 {
            2
        } else {
            3
        }
    } else {
        3
    };
    let chosen = chosen.min(last);

    if stages[chosen].peak_rpm < rpm && chosen < last {
        return Some(
            stages
                .iter()
                .position(|s| s.peak_rpm >= rpm)
                .unwrap_or(last),
        );
    }
    Some(chosen)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAGES: [RevStage; 4] = [
        RevStage { clip: "s1", peak_rpm: 3000.0 },
        RevStage { clip: "s2", peak_rpm: 5000.0 },
        RevStage { clip: "s3", peak_rpm: 7000.0 },
        RevStage { clip: "s4", peak_rpm: 8500.0 },
    ];

    #[test]
    fn from_idle_peak_selects_intensity() {
        assert_eq!(select_stage(&STAGES, 800.0, 800.0, 0.3), Some(0));
        assert_eq!(select_stage(&STAGES, 800.0, 800.0, 0.5), Some(1));
        assert_eq!(select_stage(&STAGES, 800.0, 800.0, 0.9), Some(2));
    }

    #[test]
    fn higher_rpm_buckets() {
        assert_eq!(select_stage(&STAGES, 3000.0, 800.0, 0.3), Some(1));
        assert_eq!(select_stage(&STAGES, 3000.0, 800.0, 0.6), Some(2));
        assert_eq!(select_stage(&STAGES, 4500.0, 800.0, 0.3), Some(2));
        assert_eq!(select_stage(&STAGES, 4500.0, 800.0, 0.7), Some(3));
        assert_eq!(select_stage(&STAGES, 8000.0, 800.0, 0.3), Some(3));
    }

    #[test]
    fn bumped_when_stage_would_drop_rpm() {
        let tuned = [
            RevStage { clip: "a", peak_rpm: 3000.0 },
            RevStage { clip: "b", peak_rpm: 2000.0 },
            RevStage { clip: "c", peak_rpm: 7000.0 },
        ];
        // Bucket picks "b", which peaks below the current 2100
        assert_eq!(select_stage(&tuned, 2100.0, 800.0, 0.5), Some(0));
    }

    #[test]
    fn feather_blip_ignored_while_revving() {
        assert_eq!(select_stage(&STAGES, 2000.0, 800.0, 0.08), None);
        assert_eq!(select_stage(&STAGES, 900.0, 800.0, 0.08), Some(0));
    }

    #[test]
    fn short_stage_table() {
        let two = &STAGES[..2];
        assert_eq!(select_stage(two, 800.0, 800.0, 0.9), Some(1));
        assert_eq!(select_stage(&[], 800.0, 800.0, 0.9), None);
    }
}
