//! End-to-end pipeline runs over the serialized-document codec.

use std::path::Path;

use anyhow::Result;

use ds3port::codec::TomlCodec;
use ds3port::flver::types::{
    Flver, FlverHeader, Material, Mesh, Texture, Vertex,
};
use ds3port::havok::HavokDowngrader;
use ds3port::pipeline::{Pipeline, Profile};
use ds3port::tae::{Animation, MiniHeader, Tae, TARGET_FLAGS};
use ds3port::{
    AssetCodec, AssetKind, BinaryEntry, Container, Event, Game, MaterialCatalog, Options, RuleSet,
};

/// Downgrade stand-in: the bytes come back unchanged.
struct Passthrough;

impl HavokDowngrader for Passthrough {
    fn downgrade(
        &self,
        entry: &BinaryEntry,
        _compendium: Option<&BinaryEntry>,
    ) -> Result<Vec<u8>> {
        Ok(entry.bytes.clone())
    }
}

fn options(files: &[&str]) -> Options {
    Options {
        res_dir: "res".into(),
        tools_dir: "tools".into(),
        source_id: "2070".into(),
        ported_id: "3000".into(),
        sound_id: None,
        keep_sound_ids: false,
        asset_kind: AssetKind::Character,
        tae_only: false,
        flver_only: false,
        excluded_offsets: Vec::new(),
        source_file_names: files.iter().map(|s| s.to_string()).collect(),
    }
}

fn source_tae(animations: Vec<Animation>) -> Tae {
    Tae {
        big_endian: false,
        id: 202070,
        flags: TARGET_FLAGS,
        skeleton_name: "skeleton.hkt".into(),
        sib_name: "c2070.sib".into(),
        event_bank: 21,
        animations,
    }
}

fn importing_animation(id: u64, import: u64) -> Animation {
    Animation::new(
        id,
        MiniHeader::Standard {
            imports_hkx: true,
            import_hkx_source_anim_id: import,
        },
    )
}

fn anibnd(codec: &TomlCodec, tae: &Tae) -> Vec<u8> {
    let container = Container {
        entries: vec![
            BinaryEntry::new(
                1_000_000,
                "N:\\SPRJ\\data\\chr\\c2070\\hkx\\Skeleton.hkx",
                vec![1, 2, 3],
            ),
            BinaryEntry::new(
                3000,
                "N:\\SPRJ\\data\\chr\\c2070\\hkx\\a000_003000.hkx",
                vec![4, 5, 6],
            ),
            BinaryEntry::new(
                3_000_000,
                "N:\\SPRJ\\data\\chr\\c2070\\tae\\c2070.tae",
                codec.write_tae(tae).unwrap(),
            ),
        ],
    };
    codec.write_container(&container).unwrap()
}

#[test]
fn shipped_resource_documents_load() {
    let rules = RuleSet::load(Path::new("res"), "Sekiro").unwrap();
    assert!(!rules.excluded_animations.is_empty());
    assert!(!rules.anim_remapping.is_empty());

    // A game with no sections gets empty tables, not an error.
    let ds3 = RuleSet::load(Path::new("res"), "DS3").unwrap();
    assert!(ds3.excluded_events.is_empty());

    let catalog = MaterialCatalog::load(Path::new("res")).unwrap();
    assert!(catalog.find("c[arsn].mtd").is_ok());
    assert!(catalog.find("c[arsn]_em.mtd").is_ok());
}

#[test]
fn character_anibnd_converts_and_renames() {
    let codec = TomlCodec;
    let downgrader = Passthrough;
    let tae = source_tae(vec![importing_animation(3000, 3000)]);
    let bytes = anibnd(&codec, &tae);

    let profile = Profile::new(Game::Bloodborne, AssetKind::Character);
    let mut pipeline = Pipeline::with_tables(
        &codec,
        &downgrader,
        profile,
        options(&["c2070.anibnd.dcx"]),
        RuleSet::default(),
        MaterialCatalog::default(),
    );
    let emitted = pipeline.convert_source("c2070.anibnd.dcx", &bytes).unwrap();
    assert_eq!(emitted.len(), 1);
    assert_eq!(emitted[0].file_name, "c3000.anibnd.dcx");

    let out = codec.read_container(&emitted[0].bytes).unwrap();
    let ids: Vec<i32> = out.entries.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![1_000_000, 3_000_000, 100_003_000]);

    let skeleton = &out.entries[0];
    assert_eq!(
        skeleton.name,
        "N:\\FDP\\data\\INTERROOT_win64\\chr\\c3000\\hkx\\skeleton.hkx"
    );
    let clip = &out.entries[2];
    assert_eq!(
        clip.name,
        "N:\\FDP\\data\\INTERROOT_win64\\chr\\c3000\\hkx\\a000_003000.hkx"
    );
    assert_eq!(clip.bytes, vec![4, 5, 6]);

    let ported = codec.read_tae(&out.entries[1].bytes).unwrap();
    assert_eq!(ported.id, 203_000);
    assert_eq!(ported.event_bank, 21);
    assert_eq!(
        ported.animations[0].mini_header,
        MiniHeader::Standard {
            imports_hkx: true,
            import_hkx_source_anim_id: 100_003_000,
        }
    );
}

#[test]
fn tae_only_emits_a_standalone_table() {
    let codec = TomlCodec;
    let downgrader = Passthrough;
    let tae = source_tae(vec![importing_animation(3000, 3000)]);
    let bytes = anibnd(&codec, &tae);

    let mut opts = options(&["c2070.anibnd.dcx"]);
    opts.tae_only = true;
    let mut pipeline = Pipeline::with_tables(
        &codec,
        &downgrader,
        Profile::new(Game::Bloodborne, AssetKind::Character),
        opts,
        RuleSet::default(),
        MaterialCatalog::default(),
    );
    let emitted = pipeline.convert_source("c2070.anibnd.dcx", &bytes).unwrap();
    assert_eq!(emitted.len(), 1);
    assert_eq!(emitted[0].file_name, "c3000.tae");
    let table = codec.read_tae(&emitted[0].bytes).unwrap();
    assert_eq!(table.id, 203_000);
}

#[test]
fn plain_runs_renumber_sound_ids_to_the_ported_character() {
    let codec = TomlCodec;
    let downgrader = Passthrough;

    let mut anim = importing_animation(3000, 3000);
    let mut bytes = 1i32.to_le_bytes().to_vec();
    bytes.extend(207004567i32.to_le_bytes());
    bytes.extend([0; 8]);
    anim.events = vec![Event::new(128, bytes)];
    let tae = source_tae(vec![anim]);
    let bytes = anibnd(&codec, &tae);

    // No -s equivalent set: the ported id drives the substitution.
    let mut pipeline = Pipeline::with_tables(
        &codec,
        &downgrader,
        Profile::new(Game::Bloodborne, AssetKind::Character),
        options(&["c2070.anibnd.dcx"]),
        RuleSet::default(),
        MaterialCatalog::default(),
    );
    let emitted = pipeline.convert_source("c2070.anibnd.dcx", &bytes).unwrap();
    let out = codec.read_container(&emitted[0].bytes).unwrap();
    let table = codec
        .read_tae(&out.entries.iter().find(|e| e.name.contains(".tae")).unwrap().bytes)
        .unwrap();
    let ev = &table.animations[0].events[0];
    let got = i32::from_le_bytes(ev.param_bytes[4..8].try_into().unwrap());
    assert_eq!(got, 300004567);
}

#[test]
fn excluded_rules_drop_animations_end_to_end() {
    let codec = TomlCodec;
    let downgrader = Passthrough;
    let mut rules = RuleSet::default();
    rules.excluded_animations.insert(3000);
    let tae = source_tae(vec![
        importing_animation(3000, 3000),
        Animation::new(4000, MiniHeader::Other),
    ]);
    let bytes = anibnd(&codec, &tae);

    let mut pipeline = Pipeline::with_tables(
        &codec,
        &downgrader,
        Profile::new(Game::Bloodborne, AssetKind::Character),
        options(&["c2070.anibnd.dcx"]),
        rules,
        MaterialCatalog::default(),
    );
    let emitted = pipeline.convert_source("c2070.anibnd.dcx", &bytes).unwrap();
    let out = codec.read_container(&emitted[0].bytes).unwrap();
    let table = codec
        .read_tae(&out.entries.iter().find(|e| e.name.contains(".tae")).unwrap().bytes)
        .unwrap();
    let ids: Vec<u64> = table.animations.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![4000]);
}

#[test]
fn chrbnd_converts_mesh_and_transfers_companions() {
    let codec = TomlCodec;
    let downgrader = Passthrough;
    let catalog = MaterialCatalog::load(Path::new("res")).unwrap();

    let mut mesh_source = Flver {
        header: FlverHeader::default(),
        dummies: vec![7, 7],
        materials: vec![Material {
            name: "body".into(),
            mtd: "c2070_body.mtd".into(),
            textures: vec![Texture {
                channel: "g_DiffuseTexture".into(),
                path: "N:\\SPRJ\\data\\chr\\c2070\\c2070_body.tga".into(),
            }],
            gx_index: 5,
        }],
        bones: Vec::new(),
        meshes: Vec::new(),
        buffer_layouts: Vec::new(),
        gx_lists: Vec::new(),
    };
    mesh_source.meshes.push(Mesh {
        material_index: 0,
        default_bone_index: 0,
        bone_indices: vec![0, 1, 2],
        face_sets: Vec::new(),
        layout_indices: Vec::new(),
        bounding_box: Default::default(),
        vertices: vec![Vertex::default()],
    });

    let container = Container {
        entries: vec![
            BinaryEntry::new(300, "N:\\SPRJ\\data\\chr\\c2070\\c2070.hkx", vec![9]),
            BinaryEntry::new(310, "N:\\SPRJ\\data\\chr\\c2070\\c2070.hkxpwv", vec![8]),
            BinaryEntry::new(
                200,
                "N:\\SPRJ\\data\\chr\\c2070\\c2070.flver",
                codec.write_flver(&mesh_source).unwrap(),
            ),
        ],
    };
    let bytes = codec.write_container(&container).unwrap();

    let mut pipeline = Pipeline::with_tables(
        &codec,
        &downgrader,
        Profile::new(Game::Bloodborne, AssetKind::Character),
        options(&["c2070.chrbnd.dcx"]),
        RuleSet::default(),
        catalog,
    );
    let emitted = pipeline.convert_source("c2070.chrbnd.dcx", &bytes).unwrap();
    assert_eq!(emitted[0].file_name, "c3000.chrbnd.dcx");

    let out = codec.read_container(&emitted[0].bytes).unwrap();
    assert!(out
        .entries
        .iter()
        .any(|e| e.name.ends_with("c3000.hkx")));
    assert!(out
        .entries
        .iter()
        .any(|e| e.name.ends_with("c3000.hkxpwv")));

    let mesh_entry = out
        .entries
        .iter()
        .find(|e| e.name.ends_with("c3000.flver"))
        .unwrap();
    assert_eq!(mesh_entry.id, 200);
    let mesh = codec.read_flver(&mesh_entry.bytes).unwrap();
    assert!(mesh.materials[0].mtd.ends_with("C[ARSN].mtd"));
    // Dummy mode fills every declared channel with a placeholder.
    assert_eq!(mesh.materials[0].textures.len(), 4);
    assert!(mesh.materials[0].textures[0].path.contains("SYSTEX"));
    assert_eq!(mesh.materials[0].gx_index, 0);
    assert_eq!(mesh.gx_lists.len(), 1);
    // Legacy bone table dropped, layout registered, vertex padded: the
    // preferred declaration carries a paired UV member.
    let m = &mesh.meshes[0];
    assert!(m.bone_indices.is_empty());
    assert_eq!(m.layout_indices, vec![0]);
    assert_eq!(m.vertices[0].uvs.len(), 2);
    assert_eq!(m.vertices[0].tangents.len(), 1);
    assert_eq!(m.vertices[0].colors.len(), 1);
}

#[test]
fn elden_ring_fragments_combine_on_the_last_anibnd() {
    let codec = TomlCodec;
    let downgrader = Passthrough;

    let fragment_a = codec
        .write_container(&Container {
            entries: vec![BinaryEntry::new(
                3000,
                "N:\\GR\\data\\chr\\c2070\\hkx\\a000_003000.hkx",
                vec![1],
            )],
        })
        .unwrap();
    let tae = source_tae(vec![importing_animation(3000, 3000)]);
    let fragment_b = codec
        .write_container(&Container {
            entries: vec![
                BinaryEntry::new(
                    4000,
                    "N:\\GR\\data\\chr\\c2070\\hkx\\a000_004000.hkx",
                    vec![2],
                ),
                BinaryEntry::new(
                    3_000_000,
                    "N:\\GR\\data\\chr\\c2070\\tae\\c2070.tae",
                    codec.write_tae(&tae).unwrap(),
                ),
            ],
        })
        .unwrap();

    let files = ["c2070.anibnd.dcx", "c2070_div00.anibnd.dcx"];
    let mut pipeline = Pipeline::with_tables(
        &codec,
        &downgrader,
        Profile::new(Game::EldenRing, AssetKind::Character),
        options(&files),
        RuleSet::default(),
        MaterialCatalog::default(),
    );

    let first = pipeline.convert_source(files[0], &fragment_a).unwrap();
    assert!(first.is_empty());

    let second = pipeline.convert_source(files[1], &fragment_b).unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].file_name, "c3000.anibnd.dcx");
    let out = codec.read_container(&second[0].bytes).unwrap();
    // Clips from both fragments plus the converted table.
    assert_eq!(out.entries.len(), 3);
    assert!(out.entries.iter().any(|e| e.id == 100_003_000));
    assert!(out.entries.iter().any(|e| e.id == 100_004_000));
    assert!(out.entries.iter().any(|e| e.id == 3_000_000));
}

#[test]
fn sekiro_anibnd_without_compendium_is_fatal() {
    let codec = TomlCodec;
    let downgrader = Passthrough;
    let tae = source_tae(vec![importing_animation(3000, 3000)]);
    let bytes = anibnd(&codec, &tae);

    let mut pipeline = Pipeline::with_tables(
        &codec,
        &downgrader,
        Profile::new(Game::Sekiro, AssetKind::Character),
        options(&["c2070.anibnd.dcx"]),
        RuleSet::default(),
        MaterialCatalog::default(),
    );
    let err = pipeline
        .convert_source("c2070.anibnd.dcx", &bytes)
        .unwrap_err();
    assert!(err.to_string().contains("compendium"));
}

#[test]
fn objbnd_nests_the_anibnd_and_skips_shadow_lods() {
    let codec = TomlCodec;
    let downgrader = Passthrough;
    let catalog = MaterialCatalog::load(Path::new("res")).unwrap();

    let object_tae = Tae {
        event_bank: 18,
        ..source_tae(vec![importing_animation(3000, 3000)])
    };
    let inner = Container {
        entries: vec![
            BinaryEntry::new(0, "c123456.compendium", vec![0]),
            BinaryEntry::new(
                1_000_000,
                "N:\\NTC\\data\\obj\\o123456\\hkx\\Skeleton.hkx",
                vec![1],
            ),
            BinaryEntry::new(
                3000,
                "N:\\NTC\\data\\obj\\o123456\\hkx\\a000_003000.hkx",
                vec![2],
            ),
            BinaryEntry::new(
                3_000_000,
                "N:\\NTC\\data\\obj\\o123456\\tae\\o123456.tae",
                codec.write_tae(&object_tae).unwrap(),
            ),
        ],
    };

    let mesh_doc = codec.write_flver(&Flver::default()).unwrap();
    let source = Container {
        entries: vec![
            BinaryEntry::new(
                300,
                "N:\\NTC\\data\\obj\\o123456\\o123456_c.hkx",
                vec![3],
            ),
            BinaryEntry::new(
                310,
                "N:\\NTC\\data\\obj\\o123456\\o123456_c.clm2",
                vec![4],
            ),
            BinaryEntry::new(
                400,
                "N:\\NTC\\data\\obj\\o123456\\o123456.anibnd",
                codec.write_container(&inner).unwrap(),
            ),
            BinaryEntry::new(200, "o123456.flver", mesh_doc.clone()),
            BinaryEntry::new(201, "o123456_S.flver", mesh_doc),
        ],
    };
    let bytes = codec.write_container(&source).unwrap();

    let mut opts = options(&["o123456.objbnd.dcx"]);
    opts.source_id = "123456".into();
    opts.ported_id = "003000".into();
    opts.asset_kind = AssetKind::Object;
    let mut pipeline = Pipeline::with_tables(
        &codec,
        &downgrader,
        Profile::new(Game::Sekiro, AssetKind::Object),
        opts,
        RuleSet::default(),
        catalog,
    );
    let emitted = pipeline.convert_source("o123456.objbnd.dcx", &bytes).unwrap();
    assert_eq!(emitted[0].file_name, "o003000.objbnd.dcx");

    let out = codec.read_container(&emitted[0].bytes).unwrap();
    // Collision hkx, its cloth companion, the nested anibnd, one mesh; the
    // shadow lod is dropped.
    assert!(out.entries.iter().any(|e| e.name.ends_with("o003000_c.hkx")));
    assert!(out.entries.iter().any(|e| e.name.ends_with("o003000_c.clm2")));
    assert_eq!(
        out.entries.iter().filter(|e| codec.is_flver(&e.bytes)).count(),
        1
    );

    let nested = out
        .entries
        .iter()
        .find(|e| e.name.ends_with("o003000.anibnd"))
        .unwrap();
    assert_eq!(nested.id, 400);
    let nested = codec.read_container(&nested.bytes).unwrap();
    let table_entry = nested
        .entries
        .iter()
        .find(|e| e.name.contains(".tae"))
        .unwrap();
    let table = codec.read_tae(&table_entry.bytes).unwrap();
    assert_eq!(table.event_bank, 18);
}

#[test]
fn dark_souls3_mesh_passes_through_with_texture_re_id() {
    let codec = TomlCodec;
    let downgrader = Passthrough;

    let mesh_source = Flver {
        materials: vec![Material {
            name: "body".into(),
            mtd: "C[ARSN].mtd".into(),
            textures: vec![Texture {
                channel: "g_DiffuseTexture".into(),
                path: "N:\\FDP\\data\\chr\\c2070\\c2070_body.tga".into(),
            }],
            gx_index: 0,
        }],
        ..Flver::default()
    };
    let container = Container {
        entries: vec![BinaryEntry::new(
            200,
            "N:\\FDP\\data\\INTERROOT_win64\\chr\\c2070\\c2070.flver",
            codec.write_flver(&mesh_source).unwrap(),
        )],
    };
    let bytes = codec.write_container(&container).unwrap();

    let files = ["c2070.chrbnd.dcx", "c2070.texbnd.dcx"];
    let mut pipeline = Pipeline::with_tables(
        &codec,
        &downgrader,
        Profile::new(Game::DarkSouls3, AssetKind::Character),
        options(&files),
        RuleSet::default(),
        MaterialCatalog::default(),
    );
    let emitted = pipeline.convert_source(files[0], &bytes).unwrap();
    let out = codec.read_container(&emitted[0].bytes).unwrap();
    let mesh_entry = out
        .entries
        .iter()
        .find(|e| e.name.ends_with("c3000.flver"))
        .unwrap();
    let mesh = codec.read_flver(&mesh_entry.bytes).unwrap();
    // Same-generation sources keep their materials; only the asset id in
    // texture paths moves.
    assert_eq!(mesh.materials[0].mtd, "C[ARSN].mtd");
    assert_eq!(
        mesh.materials[0].textures[0].path,
        "N:\\FDP\\data\\chr\\c3000\\c3000_body.tga"
    );
}
