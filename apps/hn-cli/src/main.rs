//! hn-cli: inspection harness for the hydronet engine.
//!
//! Builds demonstration models in memory and prints what the engine sees;
//! file I/O belongs to the persistence collaborator, not here.

use clap::{Parser, Subcommand};

use hn_core::{FluidType, HnResult, Kind};
use hn_graph::{FieldValue, Graph};
use hn_loop::{LoopSide, builder, controller, topology, traverse, validate};

#[derive(Parser)]
#[command(name = "hn-cli")]
#[command(about = "hydronet CLI - fluid-loop model inspection tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the demonstration plant and print its ordered listings
    Demo,
    /// Dump the demonstration plant as JSON snapshots
    Dump,
    /// Walk through the clone/purge lifecycle, reporting object counts
    Exercise,
    /// Build the demonstration plant and run invariant validation
    Check,
}

/// A chilled-water plant with a condenser loop bridged by a heat exchanger.
fn demo_plant(graph: &mut Graph) -> (hn_core::Handle, hn_core::Handle) {
    let chw = builder::create_loop(graph, "Chilled Water Loop", FluidType::Water);
    let cw = builder::create_loop(graph, "Condenser Loop", FluidType::Water);

    let pump = graph.add_object_named(Kind::Pump, "CHW Pump");
    let supply_inlet = graph
        .reference(chw, LoopSide::Supply.inlet_node_field())
        .expect("fresh loop has boundary nodes");
    topology::add_to_node(graph, pump, supply_inlet);

    let chiller = graph.add_object_named(Kind::Chiller, "Chiller 1");
    topology::add_branch_for_component(graph, chw, LoopSide::Supply, chiller);
    let curve = graph.add_object_named(Kind::Curve, "Chiller Cap-FT");
    graph.set_field_named(chiller, "Capacity Curve", FieldValue::Ref(curve));

    let coil = graph.add_object_named(Kind::CoilCooling, "AHU Cooling Coil");
    topology::add_branch_for_component(graph, chw, LoopSide::Demand, coil);

    let tower = graph.add_object_named(Kind::CoolingTower, "Cooling Tower");
    topology::add_branch_for_component(graph, cw, LoopSide::Supply, tower);

    // heat exchanger bridges the two loops
    let hx = graph.add_object_named(Kind::HeatExchanger, "HX");
    topology::add_branch_for_component(graph, chw, LoopSide::Supply, hx);
    let cw_anchor = traverse::demand_components(graph, cw)[2];
    topology::add_to_tertiary_node(graph, hx, cw_anchor);

    let night = graph.add_object_named(Kind::AvailabilityManager, "Night Cycle");
    controller::add_availability_manager(graph, chw, night);

    (chw, cw)
}

fn describe(graph: &Graph, handle: hn_core::Handle) -> String {
    let kind = graph
        .kind_of(handle)
        .map(|k| k.tag())
        .unwrap_or("<removed>");
    match graph.name_of(handle) {
        Some(name) => format!("{kind} '{name}'"),
        None => format!("{kind} #{handle}"),
    }
}

fn cmd_demo() -> HnResult<()> {
    let mut graph = Graph::new();
    let (chw, cw) = demo_plant(&mut graph);

    for loop_h in [chw, cw] {
        println!("== {} ==", describe(&graph, loop_h));
        for side in LoopSide::BOTH {
            println!("  {} side:", side.label());
            for entity in traverse::side_components(&graph, loop_h, side) {
                println!("    {}", describe(&graph, entity));
            }
        }
        let managers = controller::availability_managers(&graph, loop_h);
        if !managers.is_empty() {
            println!("  availability managers:");
            for (rank, mgr) in managers.iter().enumerate() {
                println!("    {}. {}", rank + 1, describe(&graph, *mgr));
            }
        }
    }
    println!("{} objects total", graph.len());
    Ok(())
}

fn cmd_dump() -> HnResult<()> {
    let mut graph = Graph::new();
    demo_plant(&mut graph);
    let json = serde_json::to_string_pretty(&graph.snapshot())
        .expect("snapshots serialize");
    println!("{json}");
    Ok(())
}

fn cmd_exercise() -> HnResult<()> {
    let mut m1 = Graph::new();
    let material = m1.add_object_named(Kind::Material, "Brick");
    m1.set_field_named(material, "Thickness", FieldValue::Double(0.1));
    let construction = m1.add_object_named(Kind::Construction, "Exterior Wall");
    m1.push_extensible_ref(construction, material);
    let info = m1.add_object_named(Kind::StandardsInformation, "Wall Standards");
    m1.adopt(construction, info);
    m1.set_field_named(info, "Construction", FieldValue::Ref(construction));
    println!("M1 starts with {} objects", m1.len());

    m1.clone_object(construction);
    println!("clone within M1: {} objects (material shared)", m1.len());

    let mut m2 = Graph::new();
    let c2 = m1.clone_object_into(construction, &mut m2).expect("live");
    println!("clone into empty M2: {} objects", m2.len());
    m1.clone_object_into(construction, &mut m2);
    println!("clone again into M2: {} objects (material reused)", m2.len());

    let m2_material = m2.extensible_refs(c2)[0];
    m2.set_field_named(m2_material, "Thickness", FieldValue::Double(0.3));
    m1.clone_object_into(construction, &mut m2);
    println!(
        "clone after mutating M2's material: {} objects (new material)",
        m2.len()
    );

    let purged = m2.purge_unused();
    println!("purge removed {} unused resource objects", purged.len());
    Ok(())
}

fn cmd_check() -> HnResult<()> {
    let mut graph = Graph::new();
    demo_plant(&mut graph);
    tracing::debug!(objects = graph.len(), "demonstration plant built");
    validate::validate_all(&graph)?;
    println!("all loop invariants hold");
    Ok(())
}

fn main() -> HnResult<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Demo => cmd_demo(),
        Commands::Dump => cmd_dump(),
        Commands::Exercise => cmd_exercise(),
        Commands::Check => cmd_check(),
    }
}
