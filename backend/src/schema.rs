diesel::table! {
    components (id) {
        id -> Text,
        name -> Text,
        kind -> Text,
        status -> Text,
        power -> Double,
        current -> Double,
        room -> Text,
        last_updated -> BigInt,
    }
}

diesel::table! {
    alerts (id) {
        id -> Text,
        kind -> Text,
        severity -> Text,
        location -> Text,
        message -> Text,
        status -> Text,
        timestamp -> BigInt,
        room -> Text,
    }
}

diesel::allow_tables_to_appear_in_same_query!(alerts, components);
