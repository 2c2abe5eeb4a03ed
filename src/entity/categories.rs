/// Entity categories used as classifier features, in feature-vector order,
/// with the annotation types each one covers.
pub const ENTITY_CATEGORIES: &[(&str, &[&str])] = &[
    (
        "Event",
        &[
            "Anniversary",
            "Date",
            "EntertainmentAwardEvent",
            "Holiday",
            "PoliticalEvent",
            "SportsEvent",
            "SportsGame",
            "SportsLeague",
            "TVShow",
        ],
    ),
    (
        "HumanProtagonist",
        &["Editor", "Journalist", "MusicGroup", "Person"],
    ),
    ("OrganizationProtagonist", &["Company", "Organization"]),
    ("Position", &["Position"]),
    (
        "Location",
        &[
            "City",
            "Continent",
            "Country",
            "Facility",
            "NaturalFeature",
            "ProvinceOrState",
            "Region",
        ],
    ),
    (
        "Product",
        &[
            "Movie",
            "MusicAlbum",
            "OperatingSystem",
            "PharmaceuticalDrug",
            "Product",
            "ProgrammingLanguage",
            "PublishedMedium",
            "RadioProgram",
            "RadioStation",
            "SportsLeague",
            "Technology",
            "TVShow",
            "TVStation",
        ],
    ),
];

/// Index into `ENTITY_CATEGORIES` of the first category listing `entity_type`.
pub fn category_index(entity_type: &str) -> Option<usize> {
    ENTITY_CATEGORIES
        .iter()
        .position(|(_, types)| types.contains(&entity_type))
}

pub fn entity_category(entity_type: &str) -> Option<&'static str> {
    category_index(entity_type).map(|index| ENTITY_CATEGORIES[index].0)
}
