//! Process-wide read-only lookup tables.
//!
//! Type trees refer to frequently used type and field names by a negative offset into a
//! shared string buffer instead of repeating them in every file; class ids identify the
//! engine class of an object when no type tree names it.

/// Offsets of type tree strings with this bit set index [`COMMON_STRINGS`].
pub const COMMON_STRING_FLAG: u32 = 0x8000_0000;

/// The shared string buffer, zero-terminated entries back to back.
pub const COMMON_STRINGS: &[u8] = b"AABB\0AnimationClip\0AnimationCurve\0AnimationState\0\
Array\0Base\0BitField\0bitset\0bool\0char\0ColorRGBA\0Component\0data\0deque\0double\0\
dynamic_array\0FastPropertyName\0first\0float\0Font\0GameObject\0Generic Mono\0\
GradientNEW\0GUID\0GUIStyle\0int\0list\0long long\0map\0Matrix4x4f\0MdFour\0\
MonoBehaviour\0MonoScript\0m_ByteSize\0m_Curve\0m_EditorClassIdentifier\0\
m_EditorHideFlags\0m_Enabled\0m_ExtensionPtr\0m_GameObject\0m_Index\0m_IsArray\0\
m_IsStatic\0m_MetaFlag\0m_Name\0m_ObjectHideFlags\0m_PrefabInternal\0\
m_PrefabParentObject\0m_Script\0m_StaticEditorFlags\0m_Type\0m_Version\0Object\0pair\0\
PPtr<Component>\0PPtr<GameObject>\0PPtr<Material>\0PPtr<MonoBehaviour>\0\
PPtr<MonoScript>\0PPtr<Object>\0PPtr<Prefab>\0PPtr<Sprite>\0PPtr<TextAsset>\0\
PPtr<Texture>\0PPtr<Texture2D>\0PPtr<Transform>\0Prefab\0Quaternionf\0Rectf\0RectInt\0\
RectOffset\0second\0set\0short\0size\0SInt16\0SInt32\0SInt64\0SInt8\0staticvector\0\
string\0TextAsset\0TextMesh\0Texture\0Texture2D\0Transform\0TypelessData\0UInt16\0\
UInt32\0UInt64\0UInt8\0unsigned int\0unsigned long long\0unsigned short\0vector\0\
Vector2f\0Vector3f\0Vector4f\0m_ScriptingClassIdentifier\0Gradient\0Type*\0\
int2_storage\0int3_storage\0BoundsInt\0m_CorrespondingSourceObject\0\
m_PrefabInstance\0m_PrefabAsset\0FileSize\0Hash128\0";

/// Look up a shared string by its offset (with [`COMMON_STRING_FLAG`] already removed).
///
/// Only offsets at the start of an entry resolve.
pub fn common_string(offset: u32) -> Option<&'static str> {
    let start = offset as usize;
    if start >= COMMON_STRINGS.len() || (start > 0 && COMMON_STRINGS[start - 1] != 0) {
        return None;
    }
    let rest = &COMMON_STRINGS[start..];
    let end = rest.iter().position(|&b| b == 0)?;
    std::str::from_utf8(&rest[..end]).ok()
}

/// Engine class names by class id.
const CLASS_NAMES: &[(i32, &str)] = &[
    (1, "GameObject"),
    (2, "Component"),
    (3, "LevelGameManager"),
    (4, "Transform"),
    (5, "TimeManager"),
    (6, "GlobalGameManager"),
    (8, "Behaviour"),
    (9, "GameManager"),
    (11, "AudioManager"),
    (13, "InputManager"),
    (18, "EditorExtension"),
    (19, "Physics2DSettings"),
    (20, "Camera"),
    (21, "Material"),
    (23, "MeshRenderer"),
    (25, "Renderer"),
    (27, "Texture"),
    (28, "Texture2D"),
    (29, "OcclusionCullingSettings"),
    (30, "GraphicsSettings"),
    (33, "MeshFilter"),
    (41, "OcclusionPortal"),
    (43, "Mesh"),
    (45, "Skybox"),
    (47, "QualitySettings"),
    (48, "Shader"),
    (49, "TextAsset"),
    (50, "Rigidbody2D"),
    (53, "Collider2D"),
    (54, "Rigidbody"),
    (55, "PhysicsManager"),
    (56, "Collider"),
    (57, "Joint"),
    (58, "CircleCollider2D"),
    (59, "HingeJoint"),
    (60, "PolygonCollider2D"),
    (61, "BoxCollider2D"),
    (62, "PhysicsMaterial2D"),
    (64, "MeshCollider"),
    (65, "BoxCollider"),
    (68, "EdgeCollider2D"),
    (72, "ComputeShader"),
    (74, "AnimationClip"),
    (78, "TagManager"),
    (81, "AudioListener"),
    (82, "AudioSource"),
    (83, "AudioClip"),
    (84, "RenderTexture"),
    (89, "Cubemap"),
    (90, "Avatar"),
    (91, "AnimatorController"),
    (93, "RuntimeAnimatorController"),
    (94, "ScriptMapper"),
    (95, "Animator"),
    (96, "TrailRenderer"),
    (98, "DelayedCallManager"),
    (102, "TextMesh"),
    (104, "RenderSettings"),
    (108, "Light"),
    (111, "Animation"),
    (114, "MonoBehaviour"),
    (115, "MonoScript"),
    (117, "Texture3D"),
    (119, "Projector"),
    (120, "LineRenderer"),
    (121, "Flare"),
    (124, "Behaviour"),
    (128, "Font"),
    (129, "PlayerSettings"),
    (130, "NamedObject"),
    (134, "PhysicMaterial"),
    (135, "SphereCollider"),
    (136, "CapsuleCollider"),
    (137, "SkinnedMeshRenderer"),
    (141, "BuildSettings"),
    (142, "AssetBundle"),
    (143, "CharacterController"),
    (147, "ResourceManager"),
    (150, "PreloadData"),
    (152, "MovieTexture"),
    (156, "TerrainData"),
    (157, "LightmapSettings"),
    (171, "SpriteAtlasDatabase"),
    (180, "AudioReverbZone"),
    (182, "WindZone"),
    (183, "Cloth"),
    (184, "SubstanceArchive"),
    (185, "ProceduralMaterial"),
    (187, "Texture2DArray"),
    (188, "CubemapArray"),
    (191, "OffMeshLink"),
    (192, "OcclusionArea"),
    (194, "NavMeshObsolete"),
    (195, "NavMeshAgent"),
    (196, "NavMeshSettings"),
    (198, "ParticleSystem"),
    (199, "ParticleSystemRenderer"),
    (200, "ShaderVariantCollection"),
    (205, "LODGroup"),
    (206, "BlendTree"),
    (207, "Motion"),
    (208, "NavMeshObstacle"),
    (210, "SortingGroup"),
    (212, "SpriteRenderer"),
    (213, "Sprite"),
    (214, "CachedSpriteAtlas"),
    (215, "ReflectionProbe"),
    (218, "Terrain"),
    (220, "LightProbeGroup"),
    (221, "AnimatorOverrideController"),
    (222, "CanvasRenderer"),
    (223, "Canvas"),
    (224, "RectTransform"),
    (225, "CanvasGroup"),
    (226, "BillboardAsset"),
    (228, "SpeedTreeWindAsset"),
    (238, "NavMeshData"),
    (240, "AudioMixer"),
    (241, "AudioMixerController"),
    (243, "AudioMixerGroupController"),
    (258, "LightProbes"),
    (271, "SampleClip"),
    (272, "AudioMixerSnapshot"),
    (273, "AudioMixerGroup"),
    (290, "AssetBundleManifest"),
    (300, "RuntimeInitializeOnLoadManager"),
    (319, "AvatarMask"),
    (320, "PlayableDirector"),
    (328, "VideoPlayer"),
    (329, "VideoClip"),
    (331, "SpriteMask"),
    (363, "OcclusionCullingData"),
    (687078895, "SpriteAtlas"),
];

/// Look up the engine class name for a class id.
pub fn class_name(class_id: i32) -> Option<&'static str> {
    CLASS_NAMES
        .binary_search_by_key(&class_id, |&(id, _)| id)
        .ok()
        .map(|index| CLASS_NAMES[index].1)
}
