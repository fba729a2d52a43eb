use pitchmap::prelude::*;

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (set RUST_LOG=debug to see query timings)
    env_logger::init();

    println!("=== Pitchmap - Getting Started ===\n");

    let engine = Engine::new()?;
    println!("✓ Created engine with {} shards\n", engine.config().shard_count);

    // === INGESTION ===
    println!("1. Upserting players and coaches");
    println!("-------------------------------");

    let people = [
        Entity::new("1", 12.97, 77.59, Sport::Cricket, Role::Player)
            .with_level(SkillLevel::Intermediate)
            .with_payload(serde_json::json!({"name": "Asha", "age": 24})),
        Entity::new("2", 12.971, 77.591, Sport::Cricket, Role::Coach)
            .with_level(SkillLevel::Professional),
        Entity::new("3", 13.5, 78.0, Sport::Football, Role::Player),
        Entity::new("4", 12.95, 77.62, Sport::Badminton, Role::Player)
            .with_level(SkillLevel::Beginner),
    ];
    let report = engine.upsert_many(people);
    println!("   Accepted {}, rejected {}\n", report.accepted, report.rejected);

    // === VIEWPORT ===
    println!("2. Viewport query");
    println!("-----------------");

    let bounds = GeoBounds::new(12.9, 13.1, 77.5, 77.7);
    for zoom in [8, 11, 16] {
        let response = engine.viewport(&ViewportQuery::new(bounds, zoom))?;
        println!(
            "   zoom {:>2}: {} in view, {} clusters, {} individual markers",
            zoom,
            response.total_in_viewport,
            response.cluster_count(),
            response.single_count()
        );
        for item in &response.clusters {
            match item {
                ClusterItem::Cluster(summary) => println!(
                    "      cluster {} x{} dominant {:?}",
                    summary.id(),
                    summary.count,
                    summary.sport_counts.dominant()
                ),
                ClusterItem::Single(entity) => {
                    println!("      {} ({}, {})", entity.id, entity.sport, entity.role)
                }
            }
        }
    }
    println!();

    // === FILTERS ===
    println!("3. Filtered viewport");
    println!("--------------------");

    let coaches =
        ViewportQuery::new(bounds, 11).with_filter(EntityFilter::any().with_role(Role::Coach));
    let response = engine.viewport(&coaches)?;
    println!("   Coaches in view: {}\n", response.total_in_viewport);

    // === NEARBY ===
    println!("4. Nearby search");
    println!("----------------");

    let nearby = engine.nearby(
        &NearbyQuery::new(12.97, 77.59)
            .radius_km(100.0)
            .limit(10),
    )?;
    for user in &nearby.users {
        println!("   {} at {:.1} km", user.entity.id, user.distance_km);
    }
    println!();

    // === ANTIMERIDIAN ===
    println!("5. Viewport across the dateline");
    println!("-------------------------------");

    engine.upsert(Entity::new("fiji", -17.7, 178.1, Sport::Swimming, Role::Player))?;
    engine.upsert(Entity::new("samoa", -13.8, -171.8, Sport::Swimming, Role::Player))?;
    let pacific = engine.viewport(&ViewportQuery::new(
        GeoBounds::new(-25.0, -5.0, 170.0, -165.0),
        4,
    ))?;
    println!("   {} swimmers across longitude 180\n", pacific.total_in_viewport);

    // === STATISTICS ===
    println!("6. Engine statistics");
    println!("--------------------");
    println!("{}", serde_json::to_string_pretty(&engine.stats())?);

    println!("\n=== Getting Started Complete! ===");
    Ok(())
}
