//! Human-readable names of rhythm labels.

/// Rhythm label → description, covering the MIT-BIH, VFDB and CUDB
/// vocabularies plus the refined sub-classes.
const RHYTHM_DESCRIPTIONS: &[(&str, &str)] = &[
    ("(AB", "Atrial bigeminy"),
    ("(AF", "atrial fibrillation"),
    ("(AFIB", "Atrial fibrillation"),
    ("(AFL", "Atrial flutter"),
    ("(ASYS", "asystole"),
    ("(B", "Ventricular bigeminy"),
    ("(B3", "Third degree heart block"),
    ("(BI", "first degree heart block"),
    ("(BII", "2° heart block"),
    ("(HGEA", "high grade ventricular ectopic activity"),
    ("(IVR", "Idioventricular rhythm"),
    ("(N", "Normal sinus rhythm"),
    ("(NOD", "Nodal (A-V junctional) rhythm"),
    ("(NOISE", "noise"),
    ("(NSR", "normal sinus rhythm"),
    ("(P", "Paced rhythm"),
    ("(PM", "pacemaker (paced rhythm)"),
    ("(PREX", "Pre-excitation (WPW)"),
    ("(SAB", "Sino-atrial block"),
    ("(SBR", "Sinus bradycardia"),
    ("(SVTA", "Supraventricular tachyarrhythmia"),
    ("(T", "Ventricular trigeminy"),
    ("(VER", "ventricular escape rhythm"),
    ("(VF", "ventricular fibrillation"),
    ("(VF.c", "ventricular fibrillation (coarse)"),
    ("(VF.f", "ventricular fibrillation (fine)"),
    ("(VFL", "ventricular flutter"),
    ("(VT", "ventricular tachycardia"),
    ("(VT.o", "Ventricular tachycardia (other)"),
    ("(VT.r", "Ventricular tachycardia (rapid)"),
    ("(VT.s", "Ventricular tachycardia (slow)"),
];

/// Description of `rhythm`, if it is a known label.
pub fn describe(rhythm: &str) -> Option<&'static str> {
    RHYTHM_DESCRIPTIONS
        .binary_search_by(|(name, _)| name.cmp(&rhythm))
        .ok()
        .map(|i| RHYTHM_DESCRIPTIONS[i].1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_sorted_for_lookup() {
        assert!(RHYTHM_DESCRIPTIONS.windows(2).all(|p| p[0].0 < p[1].0));
    }

    #[test]
    fn known_and_unknown_labels() {
        assert_eq!(describe("(VF.c"), Some("ventricular fibrillation (coarse)"));
        assert_eq!(describe("(N"), Some("Normal sinus rhythm"));
        assert_eq!(describe("(XYZ"), None);
        assert_eq!(describe(""), None);
    }
}
