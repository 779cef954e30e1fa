diesel::table! {
    characters (id) {
        id -> Integer,
        headword -> Text,
        pinyin -> Text,
        radical -> Nullable<Text>,
        strokes -> Nullable<Integer>,
        tier -> Text,
        attributes -> Text,
    }
}

diesel::table! {
    words (id) {
        id -> Integer,
        headword -> Text,
        category -> Text,
        pinyin -> Text,
        abbreviation -> Nullable<Text>,
        tier -> Text,
        attributes -> Text,
    }
}

diesel::allow_tables_to_appear_in_same_query!(characters, words,);
