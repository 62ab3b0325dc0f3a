use std::collections::HashSet;
use std::sync::Arc;

use simple_logger::SimpleLogger;

use tcrd::facet::{FacetCatalog, FacetDefinition, FnProducer};
use tcrd::ligand::{LigandRow, LigandSources};
use tcrd::store::{MemoryStore, TargetRow};
use tcrd::{ClassRow, Config, FacetValue, Filter, OntologyKind, Tcrd, TcrdError};

fn init_logger() {
    // a logger might already be installed by another test
    let _ = SimpleLogger::new().init();
}

fn store() -> MemoryStore {
    let mut store = MemoryStore::new();

    let targets = [
        (1, "P00533", "Epidermal growth factor receptor", "EGFR", "Tclin", Some("Kinase"), 0.2),
        (2, "P00519", "Tyrosine-protein kinase ABL1", "ABL1", "Tclin", Some("Kinase"), 1.5),
        (3, "P14416", "D(2) dopamine receptor", "DRD2", "Tclin", Some("GPCR"), 0.8),
        (4, "Q9Y5Y4", "Prostaglandin D2 receptor 2", "PTGDR2", "Tchem", Some("GPCR"), 3.2),
        (5, "Q8N3J9", "Zinc finger protein 664", "ZNF664", "Tdark", None, 12.0),
        (6, "Q96LB4", "Uncharacterized protein C2orf50", "C2orf50", "Tdark", None, 40.0),
        (7, "O14733", "Dual specificity MAP kinase kinase 7", "MAP2K7", "Tbio", Some("Kinase"), 2.1),
    ];
    for (tcrdid, uniprot, name, sym, tdl, fam, novelty) in targets {
        store.add_target(TargetRow {
            sym: Some(sym.to_string()),
            tdl: Some(tdl.to_string()),
            fam: fam.map(str::to_string),
            novelty: Some(novelty),
            ..TargetRow::new(tcrdid, uniprot, name)
        });
    }
    store.add_annotation(1, "GWAS", "Lung adenocarcinoma");
    store.add_annotation(2, "GWAS", "Chronic myeloid leukemia");
    store.add_annotation(3, "GWAS", "Schizophrenia");
    store.add_annotation(3, "Disease Category", "nervous system disease");
    store.add_annotation(1, "Ortholog", "Mouse");
    store.add_annotation(3, "Ortholog", "Mouse");
    store.add_annotation(3, "Ortholog", "Rat");

    for (id, name, parents) in [
        ("PC00197", "transmembrane signal receptor", "PC00000"),
        ("PC00021", "G-protein coupled receptor", "PC00197|PC00000"),
        ("PC00022", "G-protein coupled receptor, family A", "PC00021|PC00197|PC00000|PC00021"),
    ] {
        store.add_panther_class("P14416", ClassRow::new(id, name, parents));
    }

    for (id, name, parents) in [
        ("DOID:4", "disease", ""),
        ("DOID:14566", "disease of cellular proliferation", "DOID:4"),
        ("DOID:162", "cancer", "DOID:14566|DOID:4"),
        ("DOID:1240", "leukemia", "DOID:162|DOID:14566|DOID:4"),
        ("DOID:863", "nervous system disease", "DOID:4|DOID:7"),
    ] {
        store.add_ontology_row(OntologyKind::Disease, ClassRow::new(id, name, parents));
    }
    store.add_ontology_row(OntologyKind::Dto, ClassRow::new("DTO:01", "Protein", ""));

    let hash = "BSYNRYMUTXBXSQ".to_string();
    store.add_ligand(LigandRow {
        lychi_h4: Some(hash.clone()),
        source_db: Some("ChEMBL".to_string()),
        cmpd_name_in_src: Some("ASPIRIN".to_string()),
        smiles: Some("CC(=O)Oc1ccccc1C(=O)O".to_string()),
        ..LigandRow::compound("CHEMBL25")
    });
    store.add_ligand(LigandRow {
        lychi_h4: Some(hash),
        source_db: Some("DrugCentral".to_string()),
        description: Some("Non-steroidal anti-inflammatory drug".to_string()),
        ..LigandRow::drug("aspirin")
    });
    store
}

async fn tcrd() -> Tcrd {
    init_logger();
    Tcrd::start(Arc::new(store()), Config::default())
        .await
        .expect("service starts")
}

#[tokio::test]
async fn classification_paths_of_a_target() {
    let tcrd = tcrd().await;
    let forest = tcrd.classification_forest("P14416").await.unwrap();

    let entries: Vec<&str> = forest.entries().map(|n| n.id()).collect();
    assert_eq!(entries, vec!["PC00022"]);

    let family_a = forest.get("PC00022").unwrap();
    let parents: Vec<&str> = family_a.parents().map(|n| n.id()).collect();
    assert_eq!(parents, vec!["PC00021", "PC00197"]);
    assert!(family_a.parents().all(|p| p.id() != "PC00000"));

    let edges = tcrd.flat_edge_list("P14416").await.unwrap();
    assert_eq!(edges.len(), 3);
    assert_eq!(edges[2].parents.as_slice(), &["PC00021", "PC00197"]);

    let empty = tcrd.classification_forest("P00000").await.unwrap();
    assert!(empty.is_empty());
}

#[tokio::test]
async fn global_ontology_roots_and_lookup() {
    let tcrd = tcrd().await;

    let roots: Vec<&str> = tcrd
        .ontology_roots(OntologyKind::Disease)
        .unwrap()
        .into_iter()
        .map(|n| n.id())
        .collect();
    assert_eq!(roots, vec!["DOID:4"]);

    let leukemia = tcrd
        .lookup_ontology_node(OntologyKind::Disease, "Leukemia")
        .unwrap()
        .unwrap();
    assert_eq!(leukemia.id(), "DOID:1240");
    assert_eq!(leukemia.all_parents().count(), 3);

    // DOID:7 is not part of the table
    let nervous = tcrd
        .lookup_ontology_node(OntologyKind::Disease, "DOID:863")
        .unwrap()
        .unwrap();
    assert_eq!(nervous.parents().count(), 1);
    assert_eq!(nervous.parent_ids().len(), 2);

    assert!(tcrd
        .lookup_ontology_node(OntologyKind::Disease, "DOID:0")
        .unwrap()
        .is_none());

    let ontology = tcrd.ontology(OntologyKind::Disease).unwrap();
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let ontology = Arc::clone(&ontology);
            tokio::spawn(async move { ontology.roots().count() })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap(), 1);
    }
}

#[tokio::test]
async fn default_facets() {
    let tcrd = tcrd().await;
    let envelope = tcrd.aggregate_facets::<&str>(&Filter::new(), &[]).await.unwrap();

    let names: Vec<&str> = envelope.facets.iter().map(|f| f.facet.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "Target Development Level",
            "Family",
            "IMPC Phenotype",
            "GWAS",
            "Expression: Consensus",
            "Ortholog",
            "Disease Category",
        ]
    );
    assert_eq!(envelope.total, 7);

    let tdl = envelope.facet("Target Development Level").unwrap();
    assert_eq!(tdl.values[0], FacetValue::new("Tclin", 3));
    assert_eq!(tdl.count, 4);

    let targets = tcrd.targets(&envelope, 0, 5).await.unwrap();
    assert_eq!(targets.len(), 5);
}

#[tokio::test]
async fn filtered_facets_are_included() {
    let tcrd = tcrd().await;
    let filter = Filter::new()
        .with_facet("Family", vec!["Kinase"])
        .with_range("Novelty", 1, 3);

    let envelope = tcrd.aggregate_facets(&filter, &["GWAS"]).await.unwrap();
    let names: HashSet<&str> = envelope.facets.iter().map(|f| f.facet.as_str()).collect();
    assert_eq!(names, HashSet::from(["Family", "GWAS", "Novelty"]));

    // ABL1 and MAP2K7
    let family = envelope.facet("Family").unwrap();
    assert_eq!(family.values, vec![FacetValue::new("Kinase", 2)]);

    let targets = tcrd.targets(&envelope, 0, 10).await.unwrap();
    let syms: Vec<&str> = targets.iter().filter_map(|t| t.sym.as_deref()).collect();
    assert_eq!(syms, vec!["ABL1", "MAP2K7"]);
}

#[tokio::test]
async fn paginate_and_filter_result_facets() {
    let tcrd = tcrd().await;
    let mut envelope = tcrd.aggregate_all_facets(&Filter::new()).await.unwrap();
    assert_eq!(envelope.facets.len(), tcrd.facet_names().count());

    let page = tcrd
        .paginate_facet_values(&envelope, "target development level", None, 1, Some(2))
        .unwrap();
    let labels: Vec<&str> = page.iter().map(|v| v.label.as_str()).collect();
    assert_eq!(labels, vec!["Tdark", "Tbio"]);

    let page = tcrd
        .paginate_facet_values(&envelope, "Target Development Level", Some("^t[cd]"), 0, None)
        .unwrap();
    assert_eq!(page.len(), 3);

    assert!(matches!(
        tcrd.paginate_facet_values(&envelope, "Unknown", None, 0, None),
        Err(TcrdError::UnknownFacet(_))
    ));

    envelope.retain_facets(&["family"], &[]);
    assert_eq!(envelope.facets.len(), 1);
    assert_eq!(envelope.facets[0].facet, "Family");
}

#[tokio::test]
async fn failing_facet_fails_request() {
    let tcrd = tcrd().await;
    let mut catalog = FacetCatalog::new();
    let ok = Arc::new(FnProducer::new(|_f: Filter| async {
        Ok::<Vec<FacetValue>, TcrdError>(vec![FacetValue::new("A", 3), FacetValue::new("B", 7)])
    }));
    let failing = Arc::new(FnProducer::new(|_f: Filter| async {
        Err::<Vec<FacetValue>, TcrdError>(TcrdError::Store("timeout".to_string()))
    }));
    catalog.register(FacetDefinition::new("Family", ok)).unwrap();
    catalog.register(FacetDefinition::new("GWAS", failing)).unwrap();
    let tcrd = tcrd.with_catalog(catalog);

    let envelope = tcrd.aggregate_facets(&Filter::new(), &["Family"]).await.unwrap();
    assert_eq!(envelope.total, 10);

    let err = tcrd
        .aggregate_facets(&Filter::new(), &["Family", "GWAS"])
        .await
        .unwrap_err();
    assert!(matches!(err, TcrdError::Producer { ref facet, .. } if facet == "GWAS"));
}

#[tokio::test]
async fn ligand_from_both_tables() {
    let tcrd = tcrd().await;

    let ligand = tcrd
        .ligand("BSYNRYMUTXBXSQ", LigandSources::all())
        .await
        .unwrap()
        .unwrap();
    assert!(ligand.is_drug);
    assert_eq!(ligand.name, "aspirin");
    assert_eq!(ligand.activity_count, 2);
    assert!(ligand.smiles.is_some());
    let sources: Vec<&str> = ligand.synonyms.iter().map(|s| s.source.as_str()).collect();
    assert_eq!(sources, vec!["ChEMBL"]);

    let compound = tcrd
        .ligand("BSYNRYMUTXBXSQ", LigandSources::compounds())
        .await
        .unwrap()
        .unwrap();
    assert!(!compound.is_drug);
    assert_eq!(compound.name, "ASPIRIN");
    assert_eq!(compound.activity_count, 1);

    assert!(tcrd
        .ligand("ibuprofen", LigandSources::all())
        .await
        .unwrap()
        .is_none());

    assert!(tcrd.merge_ligand_rows(&[LigandRow::default()]).is_none());
}
