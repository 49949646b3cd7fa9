//! Known external field keys, one enumeration per record kind.
//!
//! The lookup tables in [`super::mapping`] are built from these enums, so a
//! key can only be renamed in one place.

macro_rules! field_keys {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($variant:ident => ($external:literal, $internal:literal)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Every key of this record kind, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Field name as it appears in storage and export data.
            pub const fn external(self) -> &'static str {
                match self {
                    $($name::$variant => $external),+
                }
            }

            /// Attribute name used by the API models.
            pub const fn internal(self) -> &'static str {
                match self {
                    $($name::$variant => $internal),+
                }
            }
        }
    };
}

field_keys! {
    /// Columns of an assessment answer row.
    AssessmentAnswerKey {
        CollectionGooruOid => ("collection_gooru_oid", "collectionGooruOId"),
        IsCorrect => ("is_correct", "isCorrect"),
        QuestionGooruOid => ("question_gooru_oid", "gooruOId"),
        Sequence => ("sequence", "sequence"),
        AnswerText => ("answer_text", "text"),
        QuestionType => ("question_type", "questionType"),
        TypeName => ("type_name", "type"),
    }
}

field_keys! {
    /// Columns of a session activity metric row.
    ///
    /// The answer choice labels `A` through `F` all land on `options`.
    SessionMetricKey {
        CollectionType => ("collection_type", "collectionType"),
        Views => ("views", "views"),
        ScoreInPercentage => ("score_in_percentage", "scoreInPercentage"),
        TimeSpent => ("time_spent", "timeSpent"),
        Reaction => ("RA", "reaction"),
        Choice => ("choice", "text"),
        Type => ("type", "questionType"),
        FeedbackProvider => ("feedback_provider", "feedbackProvider"),
        QuestionStatus => ("question_status", "status"),
        Score => ("score", "score"),
        TotalAttemptUserCount => ("tau", "totalAttemptUserCount"),
        Skipped => ("skipped", "skipped"),
        Attempts => ("attempts", "attempts"),
        Correct => ("correct", "totalCorrectCount"),
        InCorrect => ("in_correct", "totalInCorrectCount"),
        AnswerObject => ("answer_object", "answerObject"),
        Options => ("options", "options"),
        OptionA => ("A", "options"),
        OptionB => ("B", "options"),
        OptionC => ("C", "options"),
        OptionD => ("D", "options"),
        OptionE => ("E", "options"),
        OptionF => ("F", "options"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_external_keys_are_unique() {
        let answers: HashSet<_> = AssessmentAnswerKey::ALL.iter().map(|k| k.external()).collect();
        assert_eq!(answers.len(), AssessmentAnswerKey::ALL.len());

        let metrics: HashSet<_> = SessionMetricKey::ALL.iter().map(|k| k.external()).collect();
        assert_eq!(metrics.len(), SessionMetricKey::ALL.len());
    }

    #[test]
    fn test_choice_labels_share_internal_name() {
        let targets: HashSet<_> = [
            SessionMetricKey::OptionA,
            SessionMetricKey::OptionB,
            SessionMetricKey::OptionC,
            SessionMetricKey::OptionD,
            SessionMetricKey::OptionE,
            SessionMetricKey::OptionF,
        ]
        .iter()
        .map(|k| k.internal())
        .collect();

        assert_eq!(targets.len(), 1);
        assert!(targets.contains("options"));
    }
}
